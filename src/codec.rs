use crate::catalog::Catalog;
use crate::models::{Card, CardId, DeckList};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

static DECK_LINE: OnceLock<Regex> = OnceLock::new();

fn deck_line() -> &'static Regex {
    DECK_LINE.get_or_init(|| Regex::new(r"^(\d+)\s+(.+)$").expect("deck line pattern is valid"))
}

/// Lowercase, turn dashes and other punctuation into spaces, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write one `<count> <name>[ - <subtitle>]` line per card, sorted by name.
/// Cards missing from the catalog are left out.
pub fn export_text(list: &DeckList, catalog: &Catalog) -> String {
    let mut rows: Vec<(String, CardId, u32)> = list
        .iter()
        .filter_map(|(card_id, count)| {
            catalog
                .get(card_id)
                .map(|card| (card.display_name(), card_id, count))
        })
        .collect();

    rows.sort_by(|a, b| {
        a.0.to_lowercase()
            .cmp(&b.0.to_lowercase())
            .then_with(|| a.1.cmp(&b.1))
    });

    rows.iter()
        .map(|(name, _, count)| format!("{} {}", count, name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of an import: the cards that matched and the lines that did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub list: DeckList,
    pub skipped: Vec<String>,
}

/// Parse deck text into a list. Lines that do not parse or name an unknown card are dropped.
pub fn import_text(text: &str, catalog: &Catalog) -> DeckList {
    import_text_detailed(text, catalog).list
}

/// Like [`import_text`], but also reports which lines were dropped
pub fn import_text_detailed(text: &str, catalog: &Catalog) -> ImportOutcome {
    let names = name_index(catalog.cards());
    let mut counts: BTreeMap<CardId, u32> = BTreeMap::new();
    let mut skipped = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some(captures) = deck_line().captures(line) else {
            log::debug!("Skipping unparseable deck line: {}", line);
            skipped.push(line.to_string());
            continue;
        };

        let Ok(count) = captures[1].parse::<u32>() else {
            skipped.push(line.to_string());
            continue;
        };

        match names.get(&normalize_name(&captures[2])) {
            Some(&card_id) => {
                let total = counts.entry(card_id).or_insert(0);
                *total = total.saturating_add(count);
            }
            None => {
                log::debug!("No catalog card for deck line: {}", line);
                skipped.push(line.to_string());
            }
        }
    }

    ImportOutcome {
        list: counts.into_iter().collect(),
        skipped,
    }
}

/// Normalized display name to card id; the first card wins on collisions
fn name_index(cards: &[Card]) -> HashMap<String, CardId> {
    let mut index = HashMap::with_capacity(cards.len());
    for card in cards {
        index
            .entry(normalize_name(&card.display_name()))
            .or_insert(card.id);
    }
    index
}

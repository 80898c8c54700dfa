use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub type CardId = i64;
pub type DeckId = i64;

/// Hard per-card copy limit inside a deck
pub const MAX_COPIES_PER_CARD: u32 = 4;

/// Highest cost shown on its own; anything above is grouped as "9+"
pub const MAX_COST: u32 = 9;

/// The six ink colors a card can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ink {
    Amber,
    Amethyst,
    Emerald,
    Ruby,
    Sapphire,
    Steel,
}

impl Ink {
    pub const ALL: [Ink; 6] = [
        Ink::Amber,
        Ink::Amethyst,
        Ink::Emerald,
        Ink::Ruby,
        Ink::Sapphire,
        Ink::Steel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ink::Amber => "Amber",
            Ink::Amethyst => "Amethyst",
            Ink::Emerald => "Emerald",
            Ink::Ruby => "Ruby",
            Ink::Sapphire => "Sapphire",
            Ink::Steel => "Steel",
        }
    }
}

impl fmt::Display for Ink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ink {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ink::ALL
            .into_iter()
            .find(|ink| ink.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown ink: {}", trimmed))
    }
}

/// A single card record as loaded from the catalog.
///
/// Field names follow the catalog JSON. LorcanaJSON-style names (`version`,
/// `color`, `cost`, `inkwell`, ...) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(default, alias = "version", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// One ink, or several separated by commas for multicolor cards
    #[serde(default, alias = "color", deserialize_with = "null_as_default")]
    pub ink: String,
    #[serde(default, alias = "cost", deserialize_with = "null_as_default")]
    pub ink_cost: u32,
    #[serde(
        default,
        alias = "number",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub card_number: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rarity: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub card_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classifications: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lore: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, alias = "setCode", deserialize_with = "null_as_default")]
    pub set: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustrator: Option<String>,
    #[serde(default, alias = "inkwell", skip_serializing_if = "Option::is_none")]
    pub inkable: Option<bool>,
}

impl Card {
    /// Known inks of this card, in the order they appear in `ink`
    pub fn inks(&self) -> Vec<Ink> {
        self.ink
            .split(',')
            .filter_map(|part| part.parse::<Ink>().ok())
            .collect()
    }

    pub fn is_multicolor(&self) -> bool {
        self.inks().len() > 1
    }

    /// Explicit flag wins; otherwise a card is inkable unless its text says "uninkable"
    pub fn is_inkable(&self) -> bool {
        match self.inkable {
            Some(flag) => flag,
            None => !self.text.to_lowercase().contains("uninkable"),
        }
    }

    /// Segment of `type` before the first `/`, e.g. "Character" for "Character/Storyborn"
    pub fn primary_type(&self) -> &str {
        let primary = self.card_type.split('/').next().unwrap_or("").trim();
        if primary.is_empty() {
            "Other"
        } else {
            primary
        }
    }

    /// "Name - Subtitle", or just the name when there is no subtitle
    pub fn display_name(&self) -> String {
        match self.subtitle.as_deref().map(str::trim) {
            Some(subtitle) if !subtitle.is_empty() => format!("{} - {}", self.name, subtitle),
            _ => self.name.clone(),
        }
    }
}

/// Deck metadata. The card counts live in a separate [`DeckList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckMeta {
    pub id: DeckId,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub updated_at: i64,
}

/// Card id to copy count. Every present entry holds `1..=MAX_COPIES_PER_CARD`;
/// an absent entry means zero copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeckList {
    counts: BTreeMap<CardId, u32>,
}

impl DeckList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, card_id: CardId) -> u32 {
        self.counts.get(&card_id).copied().unwrap_or(0)
    }

    /// Adds one copy unless the card is already at the cap. Returns whether anything changed.
    pub fn increment(&mut self, card_id: CardId) -> bool {
        let current = self.count(card_id);
        if current >= MAX_COPIES_PER_CARD {
            return false;
        }
        self.counts.insert(card_id, current + 1);
        true
    }

    /// Removes one copy, dropping the entry when it reaches zero. Returns whether anything changed.
    pub fn decrement(&mut self, card_id: CardId) -> bool {
        match self.counts.get(&card_id).copied() {
            None => false,
            Some(current) if current <= 1 => {
                self.counts.remove(&card_id);
                true
            }
            Some(current) => {
                self.counts.insert(card_id, current - 1);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CardId, u32)> + '_ {
        self.counts.iter().map(|(id, count)| (*id, *count))
    }

    /// Number of distinct cards
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of copies
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Builds a list by repeated increments, so counts above the cap are clamped
/// and zero counts never produce an entry.
impl FromIterator<(CardId, u32)> for DeckList {
    fn from_iter<I: IntoIterator<Item = (CardId, u32)>>(iter: I) -> Self {
        let mut list = DeckList::new();
        for (card_id, count) in iter {
            for _ in 0..count.min(MAX_COPIES_PER_CARD) {
                list.increment(card_id);
            }
        }
        list
    }
}

impl<const N: usize> From<[(CardId, u32); N]> for DeckList {
    fn from(entries: [(CardId, u32); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'de> Deserialize<'de> for DeckList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<CardId, u32>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// Inclusive cost range; `hi == MAX_COST` means "9 or more"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRange {
    pub lo: u32,
    pub hi: u32,
}

impl CostRange {
    pub fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, cost: u32) -> bool {
        if cost < self.lo {
            return false;
        }
        self.hi >= MAX_COST || cost <= self.hi
    }
}

impl Default for CostRange {
    fn default() -> Self {
        Self { lo: 0, hi: MAX_COST }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkableFilter {
    #[default]
    Any,
    Inkable,
    Uninkable,
}

/// Facet selection. Empty sets and the default range are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub inks: BTreeSet<Ink>,
    #[serde(default)]
    pub types: BTreeSet<String>,
    #[serde(default)]
    pub rarities: BTreeSet<String>,
    #[serde(default)]
    pub sets: BTreeSet<String>,
    #[serde(default)]
    pub cost: CostRange,
    #[serde(default)]
    pub inkable: InkableFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBucket {
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    pub total: u32,
    pub inkable_count: u32,
    pub uninkable_count: u32,
    pub type_distribution: BTreeMap<String, u32>,
    pub ink_distribution: BTreeMap<Ink, u32>,
    /// Always nine buckets: "1" through "8", then "9+"
    pub cost_curve: Vec<CostBucket>,
}

/// A deck row joined with its catalog card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckCardEntry {
    pub card: Card,
    pub count: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Card numbers show up as both strings and integers depending on the dump.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

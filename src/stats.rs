use crate::catalog::Catalog;
use crate::models::{CostBucket, DeckList, DeckStats, MAX_COST};
use serde::Serialize;
use std::collections::BTreeMap;

/// Standard constructed deck size
pub const DECK_SIZE: u32 = 60;

const CURVE_BUCKETS: usize = MAX_COST as usize;

/// Curve slot for a cost. 1..=8 get their own bucket; 0 (unknown) and 9+ share the last one.
pub fn cost_bucket_index(cost: u32) -> usize {
    match cost {
        1..=8 => cost as usize - 1,
        _ => CURVE_BUCKETS - 1,
    }
}

/// Display label for a cost, "9+" from nine up
pub fn format_cost(cost: u32) -> String {
    if cost >= MAX_COST {
        format!("{}+", MAX_COST)
    } else {
        cost.to_string()
    }
}

fn empty_curve() -> Vec<CostBucket> {
    (1..=MAX_COST)
        .map(|cost| CostBucket {
            label: format_cost(cost),
            count: 0,
        })
        .collect()
}

/// Reduce a deck list to its summary numbers.
///
/// Cards missing from the catalog are skipped, so every total below covers
/// the same set of copies.
pub fn compute_stats(list: &DeckList, catalog: &Catalog) -> DeckStats {
    let mut stats = DeckStats {
        total: 0,
        inkable_count: 0,
        uninkable_count: 0,
        type_distribution: BTreeMap::new(),
        ink_distribution: BTreeMap::new(),
        cost_curve: empty_curve(),
    };

    for (card_id, count) in list.iter() {
        let Some(card) = catalog.get(card_id) else {
            log::debug!("Card {} not in catalog, skipped in stats", card_id);
            continue;
        };

        stats.total += count;

        if card.is_inkable() {
            stats.inkable_count += count;
        } else {
            stats.uninkable_count += count;
        }

        *stats
            .type_distribution
            .entry(card.primary_type().to_string())
            .or_insert(0) += count;

        for ink in card.inks() {
            *stats.ink_distribution.entry(ink).or_insert(0) += count;
        }

        stats.cost_curve[cost_bucket_index(card.ink_cost)].count += count;
    }

    stats
}

/// One slice of a distribution chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub label: String,
    pub value: u32,
    /// Rounded share of the total, 0 when the total is 0
    pub percentage: u32,
}

/// Turn a distribution into slices, largest first (ties by label)
pub fn chart_slices<I, L>(distribution: I) -> Vec<ChartSlice>
where
    I: IntoIterator<Item = (L, u32)>,
    L: ToString,
{
    let entries: Vec<(String, u32)> = distribution
        .into_iter()
        .map(|(label, value)| (label.to_string(), value))
        .collect();
    let total: u32 = entries.iter().map(|(_, value)| value).sum();

    let mut slices: Vec<ChartSlice> = entries
        .into_iter()
        .map(|(label, value)| ChartSlice {
            label,
            value,
            percentage: if total > 0 {
                ((value as f64 / total as f64) * 100.0).round() as u32
            } else {
                0
            },
        })
        .collect();

    slices.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    slices
}

pub fn ink_slices(stats: &DeckStats) -> Vec<ChartSlice> {
    chart_slices(stats.ink_distribution.iter().map(|(ink, count)| (*ink, *count)))
}

pub fn inkable_slices(stats: &DeckStats) -> Vec<ChartSlice> {
    chart_slices([
        ("Inkable", stats.inkable_count),
        ("Uninkable", stats.uninkable_count),
    ])
}

pub fn type_slices(stats: &DeckStats) -> Vec<ChartSlice> {
    chart_slices(stats.type_distribution.iter().map(|(ty, count)| (ty.as_str(), *count)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check a deck against the construction rules
pub fn validate_deck(list: &DeckList, catalog: &Catalog) -> DeckValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let total = list.total();
    if total < DECK_SIZE {
        errors.push(format!(
            "Deck must contain at least {} cards. Current: {}",
            DECK_SIZE, total
        ));
    } else if total > DECK_SIZE {
        warnings.push(format!(
            "Deck contains {} cards. Standard deck size is {}.",
            total, DECK_SIZE
        ));
    }

    for (card_id, _) in list.iter() {
        if catalog.get(card_id).is_none() {
            warnings.push(format!("Card {} is not in the catalog", card_id));
        }
    }

    DeckValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_catalog, CatalogOrigin};
    use crate::models::Ink;

    fn catalog() -> Catalog {
        let json = r#"[
            {"id": 1, "name": "Mickey Mouse", "ink": "Ruby", "ink_cost": 3, "type": "Character/Floodborn", "text": ""},
            {"id": 2, "name": "Elsa", "ink": "Sapphire", "ink_cost": 6, "type": "Character", "text": ""},
            {"id": 3, "name": "Lucky Dime", "ink": "Sapphire", "ink_cost": 9, "type": "Item", "text": "Uninkable"},
            {"id": 4, "name": "Grand Finale", "ink": "Ruby", "ink_cost": 12, "type": "Action/Song", "text": "", "inkable": false},
            {"id": 5, "name": "Free Card", "ink": "Ruby, Sapphire", "ink_cost": 0, "type": "Action", "text": ""},
            {"id": 6, "name": "One Drop", "ink": "Ruby", "ink_cost": 1, "type": "Character", "text": ""}
        ]"#;
        Catalog::new(parse_catalog(json).unwrap(), CatalogOrigin::Bundled)
    }

    fn assert_totals_agree(stats: &DeckStats) {
        assert_eq!(stats.inkable_count + stats.uninkable_count, stats.total);
        assert_eq!(stats.cost_curve.iter().map(|b| b.count).sum::<u32>(), stats.total);
        assert_eq!(stats.type_distribution.values().sum::<u32>(), stats.total);
    }

    #[test]
    fn test_curve_has_nine_labelled_buckets() {
        let stats = compute_stats(&DeckList::new(), &catalog());
        let labels: Vec<&str> = stats.cost_curve.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9+"]);
        assert_eq!(stats.total, 0);
        assert_totals_agree(&stats);
    }

    #[test]
    fn test_cost_zero_folds_into_nine_plus() {
        assert_eq!(cost_bucket_index(0), 8);
        assert_eq!(cost_bucket_index(1), 0);
        assert_eq!(cost_bucket_index(8), 7);
        assert_eq!(cost_bucket_index(9), 8);
        assert_eq!(cost_bucket_index(40), 8);

        let stats = compute_stats(&DeckList::from([(5, 2)]), &catalog());
        assert_eq!(stats.cost_curve[8].count, 2);
    }

    #[test]
    fn test_compute_stats() {
        let list = DeckList::from([(1, 4), (2, 2), (3, 1), (4, 3), (5, 2), (6, 1)]);
        let stats = compute_stats(&list, &catalog());

        assert_eq!(stats.total, 13);
        assert_eq!(stats.uninkable_count, 4);
        assert_eq!(stats.inkable_count, 9);

        assert_eq!(stats.type_distribution["Character"], 7);
        assert_eq!(stats.type_distribution["Item"], 1);
        assert_eq!(stats.type_distribution["Action"], 5);

        // The multicolor card counts toward both inks
        assert_eq!(stats.ink_distribution[&Ink::Ruby], 10);
        assert_eq!(stats.ink_distribution[&Ink::Sapphire], 5);

        assert_eq!(stats.cost_curve[0].count, 1);
        assert_eq!(stats.cost_curve[2].count, 4);
        assert_eq!(stats.cost_curve[5].count, 2);
        assert_eq!(stats.cost_curve[8].count, 6);

        assert_totals_agree(&stats);
    }

    #[test]
    fn test_missing_cards_are_skipped() {
        let list = DeckList::from([(1, 2), (404, 4)]);
        let stats = compute_stats(&list, &catalog());
        assert_eq!(stats.total, 2);
        assert_totals_agree(&stats);
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(0), "0");
        assert_eq!(format_cost(8), "8");
        assert_eq!(format_cost(9), "9+");
        assert_eq!(format_cost(11), "9+");
    }

    #[test]
    fn test_chart_slices() {
        let stats = compute_stats(&DeckList::from([(1, 3), (3, 1)]), &catalog());

        let inkable = inkable_slices(&stats);
        assert_eq!(inkable[0].label, "Inkable");
        assert_eq!(inkable[0].percentage, 75);
        assert_eq!(inkable[1].percentage, 25);

        let inks = ink_slices(&stats);
        assert_eq!(inks[0].label, "Ruby");

        assert!(chart_slices(Vec::<(String, u32)>::new()).is_empty());
        let zero = chart_slices([("A", 0)]);
        assert_eq!(zero[0].percentage, 0);
    }

    #[test]
    fn test_validate_deck() {
        let catalog = catalog();

        let small = validate_deck(&DeckList::from([(1, 4)]), &catalog);
        assert!(!small.is_valid);
        assert!(small.errors[0].contains("at least 60"));

        let oversized: DeckList = (100..115).map(|id| (id, 4)).chain([(1, 1)]).collect();
        let result = validate_deck(&oversized, &catalog);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("61 cards")));
        assert!(result.warnings.iter().any(|w| w.contains("not in the catalog")));
    }
}

use crate::models::{Card, Filters, InkableFilter};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Keep the cards that pass every active facet, preserving input order.
///
/// Facets combine with AND; the values selected inside one facet combine with OR.
/// An empty selection (or the default cost range / `Any`) never excludes a card.
pub fn resolve<'a, I>(candidates: I, filters: &Filters) -> Vec<Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    candidates
        .into_iter()
        .filter(|card| matches(card, filters))
        .cloned()
        .collect()
}

/// Whether a single card passes all facets
pub fn matches(card: &Card, filters: &Filters) -> bool {
    passes_ink(card, filters)
        && passes_type(card, filters)
        && passes_rarity(card, filters)
        && passes_set(card, filters)
        && passes_cost(card, filters)
        && passes_inkable(card, filters)
}

pub fn passes_ink(card: &Card, filters: &Filters) -> bool {
    filters.inks.is_empty() || card.inks().iter().any(|ink| filters.inks.contains(ink))
}

/// Case-insensitive membership, ignoring surrounding whitespace on both sides
fn selected_contains(selected: &BTreeSet<String>, value: &str) -> bool {
    let value = value.trim();
    selected
        .iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(value))
}

pub fn passes_type(card: &Card, filters: &Filters) -> bool {
    filters.types.is_empty() || selected_contains(&filters.types, card.primary_type())
}

pub fn passes_rarity(card: &Card, filters: &Filters) -> bool {
    filters.rarities.is_empty() || selected_contains(&filters.rarities, &card.rarity)
}

pub fn passes_set(card: &Card, filters: &Filters) -> bool {
    filters.sets.is_empty() || selected_contains(&filters.sets, &card.set)
}

pub fn passes_cost(card: &Card, filters: &Filters) -> bool {
    filters.cost.contains(card.ink_cost)
}

pub fn passes_inkable(card: &Card, filters: &Filters) -> bool {
    match filters.inkable {
        InkableFilter::Any => true,
        InkableFilter::Inkable => card.is_inkable(),
        InkableFilter::Uninkable => !card.is_inkable(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Cost,
    Type,
    Ink,
}

/// Stable sort by the given key
pub fn sort_cards(cards: &mut [Card], key: SortKey) {
    cards.sort_by(|a, b| compare(a, b, key));
}

fn compare(a: &Card, b: &Card, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Cost => a.ink_cost.cmp(&b.ink_cost),
        SortKey::Type => a.card_type.cmp(&b.card_type),
        SortKey::Ink => a.ink.cmp(&b.ink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_catalog;
    use crate::models::{CostRange, Ink};

    fn cards() -> Vec<Card> {
        parse_catalog(
            r#"[
            {"id": 1, "name": "Mickey Mouse", "ink": "Ruby", "ink_cost": 3, "type": "Character/Storyborn",
             "rarity": "Common", "set": "TFC", "text": ""},
            {"id": 2, "name": "Elsa", "ink": "Sapphire", "ink_cost": 6, "type": "Character",
             "rarity": "Rare", "set": "TFC", "text": ""},
            {"id": 3, "name": "Lucky Dime", "ink": "Amber", "ink_cost": 7, "type": "Item",
             "rarity": "Rare", "set": "ROTF", "text": "This card is Uninkable."},
            {"id": 4, "name": "Hydra", "ink": "Steel", "ink_cost": 11, "type": "Character",
             "rarity": "Legendary", "set": "ITI", "text": "", "inkable": false},
            {"id": 5, "name": "Dual", "ink": "Amber, Steel", "ink_cost": 2, "type": "Action/Song",
             "rarity": "Uncommon", "set": "SDS", "text": "Uninkable", "inkable": true},
            {"id": 6, "name": "Zero", "ink": "Emerald", "ink_cost": 0, "type": "Location", "text": ""}
        ]"#,
        )
        .unwrap()
    }

    fn ids(cards: &[Card]) -> Vec<i64> {
        cards.iter().map(|card| card.id).collect()
    }

    #[test]
    fn test_default_filters_pass_everything() {
        let all = cards();
        assert_eq!(resolve(&all, &Filters::default()).len(), all.len());
    }

    #[test]
    fn test_ink_facet_or_within() {
        let all = cards();
        let filters = Filters {
            inks: [Ink::Steel, Ink::Ruby].into_iter().collect(),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &filters)), vec![1, 4, 5]);
    }

    #[test]
    fn test_type_facet_uses_primary_segment() {
        let all = cards();
        let filters = Filters {
            types: ["character".to_string()].into_iter().collect(),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &filters)), vec![1, 2, 4]);
    }

    #[test]
    fn test_cost_facet_open_ended() {
        let all = cards();

        let nine_plus = Filters {
            cost: CostRange::new(7, 9),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &nine_plus)), vec![3, 4]);

        let bounded = Filters {
            cost: CostRange::new(2, 6),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &bounded)), vec![1, 2, 5]);
    }

    #[test]
    fn test_rarity_and_set_facets() {
        let all = cards();
        let filters = Filters {
            rarities: ["Rare".to_string()].into_iter().collect(),
            sets: ["tfc".to_string()].into_iter().collect(),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &filters)), vec![2]);
    }

    #[test]
    fn test_selected_values_are_trimmed() {
        let all = cards();
        let filters = Filters {
            types: [" Item ".to_string()].into_iter().collect(),
            rarities: ["rare ".to_string()].into_iter().collect(),
            sets: ["  rotf".to_string()].into_iter().collect(),
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &filters)), vec![3]);
    }

    #[test]
    fn test_uninkable_text_match() {
        let mut all = cards();
        // Exactly one card relies on its text: remove the explicit-flag ones
        all.retain(|card| card.inkable.is_none());

        let filters = Filters {
            cost: CostRange::new(1, 9),
            inkable: InkableFilter::Uninkable,
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &filters)), vec![3]);
    }

    #[test]
    fn test_explicit_inkable_flag_wins() {
        let all = cards();

        let uninkable = Filters {
            inkable: InkableFilter::Uninkable,
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &uninkable)), vec![3, 4]);

        let inkable = Filters {
            inkable: InkableFilter::Inkable,
            ..Filters::default()
        };
        assert_eq!(ids(&resolve(&all, &inkable)), vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_facet_order_is_irrelevant() {
        let all = cards();
        let filters = Filters {
            inks: [Ink::Amber, Ink::Steel].into_iter().collect(),
            cost: CostRange::new(2, 9),
            inkable: InkableFilter::Uninkable,
            ..Filters::default()
        };

        type Facet = fn(&Card, &Filters) -> bool;
        let facets: [Facet; 3] = [passes_ink, passes_cost, passes_inkable];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let expected = ids(&resolve(&all, &filters));
        for order in orders {
            let mut remaining = all.clone();
            for i in order {
                remaining.retain(|card| facets[i](card, &filters));
            }
            assert_eq!(ids(&remaining), expected);
        }
        assert_eq!(expected, vec![3, 4]);
    }

    #[test]
    fn test_sort_cards() {
        let mut all = cards();
        sort_cards(&mut all, SortKey::Cost);
        assert_eq!(ids(&all), vec![6, 5, 1, 2, 3, 4]);

        sort_cards(&mut all, SortKey::Name);
        assert_eq!(all[0].name, "Dual");
    }
}

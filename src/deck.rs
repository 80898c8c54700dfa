use crate::catalog::Catalog;
use crate::models::{CardId, DeckCardEntry, DeckId, DeckList, DeckMeta};
use std::collections::HashMap;

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// In-memory decks and their card lists.
///
/// Every count stays within `1..=4` because all changes go through
/// [`DeckList::increment`] and [`DeckList::decrement`]; there is no direct
/// "set count" operation.
#[derive(Debug, Clone, Default)]
pub struct DeckStore {
    decks: Vec<DeckMeta>,
    lists: HashMap<DeckId, DeckList>,
    selected: Option<DeckId>,
    last_id: DeckId,
}

impl DeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store from persisted decks. Nothing is selected afterwards.
    pub fn restore(saved: Vec<(DeckMeta, DeckList)>) -> Self {
        let mut store = Self::new();
        for (meta, list) in saved {
            store.last_id = store.last_id.max(meta.id);
            store.lists.insert(meta.id, list);
            store.decks.push(meta);
        }
        store
    }

    /// Ids come from the creation time in milliseconds, bumped if two decks share a millisecond.
    /// At the top of the id range it steps down to the nearest free id instead.
    fn next_id(&mut self, now: i64) -> DeckId {
        let mut id = now.max(self.last_id.saturating_add(1));
        while self.lists.contains_key(&id) {
            id -= 1;
        }
        self.last_id = self.last_id.max(id);
        id
    }

    /// Create an empty deck and return its id
    pub fn create_deck(&mut self, name: &str) -> DeckId {
        self.create_with_list(name, DeckList::new())
    }

    /// Create a deck that starts out with `list`
    pub fn create_with_list(&mut self, name: &str, list: DeckList) -> DeckId {
        let now = now_millis();
        let id = self.next_id(now);
        self.decks.push(DeckMeta {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        });
        self.lists.insert(id, list);
        log::debug!("Created deck {} ({})", id, name);
        id
    }

    /// All decks in creation order
    pub fn decks(&self) -> &[DeckMeta] {
        &self.decks
    }

    pub fn deck(&self, deck_id: DeckId) -> Option<&DeckMeta> {
        self.decks.iter().find(|meta| meta.id == deck_id)
    }

    pub fn list(&self, deck_id: DeckId) -> Option<&DeckList> {
        self.lists.get(&deck_id)
    }

    pub fn selected(&self) -> Option<DeckId> {
        self.selected
    }

    /// Select an existing deck. Unknown ids leave the selection alone.
    pub fn select(&mut self, deck_id: DeckId) -> bool {
        if self.lists.contains_key(&deck_id) {
            self.selected = Some(deck_id);
            true
        } else {
            false
        }
    }

    fn touch(&mut self, deck_id: DeckId) {
        let now = now_millis();
        if let Some(meta) = self.decks.iter_mut().find(|meta| meta.id == deck_id) {
            meta.updated_at = now.max(meta.updated_at);
        }
    }

    /// Add one copy, capped at four. Returns the new count, or `None` for an unknown deck.
    pub fn increment(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        let list = self.lists.get_mut(&deck_id)?;
        let changed = list.increment(card_id);
        let count = list.count(card_id);
        if changed {
            self.touch(deck_id);
        }
        Some(count)
    }

    /// Remove one copy; the entry disappears at zero. Returns the new count, or `None` for an unknown deck.
    pub fn decrement(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        let list = self.lists.get_mut(&deck_id)?;
        let changed = list.decrement(card_id);
        let count = list.count(card_id);
        if changed {
            self.touch(deck_id);
        }
        Some(count)
    }

    pub fn remove(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        self.decrement(deck_id, card_id)
    }

    /// The selected deck, creating and selecting one named `default_name` if there is none
    pub fn ensure_deck(&mut self, default_name: &str) -> DeckId {
        if let Some(deck_id) = self.selected {
            if self.lists.contains_key(&deck_id) {
                return deck_id;
            }
        }

        let deck_id = self.create_deck(default_name);
        self.selected = Some(deck_id);
        log::info!("No deck selected, created {} ({})", deck_id, default_name);
        deck_id
    }

    /// Add a card to the selected deck, creating one first if nothing is selected.
    /// Returns the target deck and the card's new count.
    pub fn add_or_prompt_target(&mut self, card_id: CardId, default_name: &str) -> (DeckId, u32) {
        let deck_id = self.ensure_deck(default_name);
        let count = self.increment(deck_id, card_id).unwrap_or(0);
        (deck_id, count)
    }

    pub fn rename(&mut self, deck_id: DeckId, name: &str) -> bool {
        let now = now_millis();
        match self.decks.iter_mut().find(|meta| meta.id == deck_id) {
            Some(meta) => {
                meta.name = name.to_string();
                meta.updated_at = now.max(meta.updated_at);
                true
            }
            None => false,
        }
    }

    /// Drop a deck and its list. Clears the selection if it pointed here.
    pub fn delete_deck(&mut self, deck_id: DeckId) -> bool {
        let before = self.decks.len();
        self.decks.retain(|meta| meta.id != deck_id);
        self.lists.remove(&deck_id);
        if self.selected == Some(deck_id) {
            self.selected = None;
        }
        self.decks.len() != before
    }

    pub fn count_in_selected(&self, card_id: CardId) -> u32 {
        self.selected
            .and_then(|deck_id| self.lists.get(&deck_id))
            .map(|list| list.count(card_id))
            .unwrap_or(0)
    }
}

/// Join a deck list with the catalog. Ids missing from the catalog are skipped.
pub fn deck_entries(list: &DeckList, catalog: &Catalog) -> Vec<DeckCardEntry> {
    list.iter()
        .filter_map(|(card_id, count)| {
            catalog.get(card_id).map(|card| DeckCardEntry {
                card: card.clone(),
                count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_catalog, CatalogOrigin};
    use crate::models::MAX_COPIES_PER_CARD;

    #[test]
    fn test_create_deck_is_empty() {
        let mut store = DeckStore::new();
        let id = store.create_deck("Aggro");

        let meta = store.deck(id).unwrap();
        assert_eq!(meta.name, "Aggro");
        assert_eq!(meta.created_at, meta.updated_at);
        assert!(store.list(id).unwrap().is_empty());
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_ids_are_unique_within_a_millisecond() {
        let mut store = DeckStore::new();
        let ids: Vec<DeckId> = (0..5).map(|i| store.create_deck(&format!("Deck {}", i))).collect();

        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_increment_caps_at_four() {
        let mut store = DeckStore::new();
        let id = store.create_deck("Cap");

        for _ in 0..MAX_COPIES_PER_CARD {
            store.increment(id, 7);
        }
        let before = store.list(id).unwrap().clone();
        let updated = store.deck(id).unwrap().updated_at;

        assert_eq!(store.increment(id, 7), Some(4));
        assert_eq!(store.list(id).unwrap(), &before);
        assert_eq!(store.deck(id).unwrap().updated_at, updated);
    }

    #[test]
    fn test_decrement_removes_entry_at_zero() {
        let mut store = DeckStore::new();
        let id = store.create_deck("Trim");

        store.increment(id, 3);
        store.increment(id, 3);
        assert_eq!(store.decrement(id, 3), Some(1));
        assert_eq!(store.remove(id, 3), Some(0));
        assert!(store.list(id).unwrap().is_empty());

        // Absent card: no-op
        assert_eq!(store.decrement(id, 3), Some(0));
        assert!(store.list(id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_deck_is_ignored() {
        let mut store = DeckStore::new();
        assert_eq!(store.increment(42, 1), None);
        assert_eq!(store.decrement(42, 1), None);
        assert!(!store.select(42));
    }

    #[test]
    fn test_first_add_creates_exactly_one_deck() {
        let mut store = DeckStore::new();
        assert!(store.decks().is_empty());

        let (deck_id, count) = store.add_or_prompt_target(11, "Quick Deck");

        assert_eq!(count, 1);
        assert_eq!(store.decks().len(), 1);
        assert_eq!(store.decks()[0].name, "Quick Deck");
        assert_eq!(store.selected(), Some(deck_id));
        assert_eq!(store.list(deck_id).unwrap(), &DeckList::from([(11, 1)]));

        // Second add goes to the same deck
        let (again, count) = store.add_or_prompt_target(11, "Quick Deck");
        assert_eq!(again, deck_id);
        assert_eq!(count, 2);
        assert_eq!(store.decks().len(), 1);
        assert_eq!(store.count_in_selected(11), 2);
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut store = DeckStore::new();
        let id = store.create_deck("Temp");
        store.select(id);
        store.increment(id, 1);

        assert!(store.delete_deck(id));
        assert_eq!(store.selected(), None);
        assert!(store.list(id).is_none());
        assert!(!store.delete_deck(id));
    }

    #[test]
    fn test_restore_keeps_ids_ahead() {
        let saved = vec![(
            DeckMeta {
                id: i64::MAX / 2,
                name: "Future".to_string(),
                created_at: 0,
                updated_at: 0,
            },
            DeckList::from([(1, 2)]),
        )];
        let mut store = DeckStore::restore(saved);
        let id = store.create_deck("Next");
        assert!(id > i64::MAX / 2);
        assert_eq!(store.list(i64::MAX / 2).unwrap().count(1), 2);
    }

    #[test]
    fn test_restore_with_max_id_does_not_overflow() {
        let saved = vec![(
            DeckMeta {
                id: i64::MAX,
                name: "Edge".to_string(),
                created_at: 0,
                updated_at: 0,
            },
            DeckList::new(),
        )];
        let mut store = DeckStore::restore(saved);
        let first = store.create_deck("After");
        let second = store.create_deck("Later");

        assert_eq!(first, i64::MAX - 1);
        assert_eq!(second, i64::MAX - 2);
        assert_eq!(store.decks().len(), 3);
        assert_eq!(store.deck(i64::MAX).unwrap().name, "Edge");
    }

    #[test]
    fn test_deck_entries_skip_missing_cards() {
        let catalog = Catalog::new(
            parse_catalog(r#"[{"id": 1, "name": "Elsa"}]"#).unwrap(),
            CatalogOrigin::Bundled,
        );
        let list = DeckList::from([(1, 2), (99, 1)]);

        let entries = deck_entries(&list, &catalog);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].card.name, "Elsa");
        assert_eq!(entries[0].count, 2);
    }
}

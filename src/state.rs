use crate::catalog::{Catalog, CatalogLoader};
use crate::codec;
use crate::config::{AppConfig, ConfigManager};
use crate::db;
use crate::deck::{self, DeckStore};
use crate::filter;
use crate::models::{Card, CardId, DeckCardEntry, DeckId, DeckList, DeckMeta, DeckStats, Filters};
use crate::search::{build_index, SearchIndex};
use crate::stats::{self, DeckValidation};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of saving a deck. `persisted` is false when the store write failed;
/// the in-memory deck is updated either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub deck_id: DeckId,
    pub persisted: bool,
}

/// Application state: configuration, catalog, search index, current query and decks.
///
/// Consumers hold a reference to this instead of reaching into globals.
pub struct AppState {
    db_path: PathBuf,
    config: AppConfig,
    loader: CatalogLoader,
    catalog: Arc<Catalog>,
    index: SearchIndex,
    decks: DeckStore,
    query: String,
    filters: Filters,
}

impl AppState {
    /// Open the database at `db_path`, read persisted settings and restore saved decks
    pub async fn open(db_path: PathBuf) -> Result<Self> {
        db::init_database(&db_path)?;
        let config = ConfigManager::new(db_path.clone())?.load().await?;
        Self::with_config(db_path, config)
    }

    /// Like [`AppState::open`] but with explicit settings
    pub fn with_config(db_path: PathBuf, config: AppConfig) -> Result<Self> {
        db::init_database(&db_path)?;

        let loader = CatalogLoader::new(db_path.clone(), &config)?;

        let decks = match db::load_decks(&db_path) {
            Ok(saved) => {
                log::info!("Restored {} saved decks", saved.len());
                DeckStore::restore(saved)
            }
            Err(e) => {
                log::error!("Failed to restore saved decks: {}", e);
                DeckStore::new()
            }
        };

        let catalog = Arc::new(Catalog::empty());
        let index = build_index(&catalog)?;

        Ok(Self {
            db_path,
            config,
            loader,
            catalog,
            index,
            decks,
            query: String::new(),
            filters: Filters::default(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // Catalog and search

    /// Load the catalog (once) and make sure the index matches it
    pub async fn load_catalog(&mut self) -> Arc<Catalog> {
        let catalog = self.loader.load().await;
        self.install_catalog(Arc::clone(&catalog));
        catalog
    }

    /// Swap in a catalog; the index is rebuilt only when the content differs.
    /// If the rebuild fails the previous index stays in place.
    pub fn install_catalog(&mut self, catalog: Arc<Catalog>) {
        if !self.index.is_current(&catalog) {
            match build_index(&catalog) {
                Ok(index) => self.index = index,
                Err(e) => log::error!("Failed to build search index: {:#}", e),
            }
        }
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.catalog.get(card_id)
    }

    fn ranked_ids(&self, query: &str) -> Vec<CardId> {
        self.index.search(query).unwrap_or_else(|e| {
            log::warn!("Search for '{}' failed: {:#}", query, e);
            Vec::new()
        })
    }

    /// Cards matching `query` by relevance, no facets applied
    pub fn search(&self, query: &str) -> Vec<Card> {
        self.ranked_ids(query)
            .into_iter()
            .filter_map(|card_id| self.catalog.get(card_id).cloned())
            .collect()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    /// Reset both the query and the facets
    pub fn clear_filters(&mut self) {
        self.query.clear();
        self.filters = Filters::default();
    }

    /// Current query narrowed by the current facets
    pub fn results(&self) -> Vec<Card> {
        let ranked = self.ranked_ids(&self.query);
        let candidates = ranked
            .into_iter()
            .filter_map(|card_id| self.catalog.get(card_id));
        filter::resolve(candidates, &self.filters)
    }

    // Decks

    pub fn decks(&self) -> &[DeckMeta] {
        self.decks.decks()
    }

    pub fn deck(&self, deck_id: DeckId) -> Option<&DeckMeta> {
        self.decks.deck(deck_id)
    }

    pub fn deck_list(&self, deck_id: DeckId) -> Option<&DeckList> {
        self.decks.list(deck_id)
    }

    pub fn selected_deck(&self) -> Option<DeckId> {
        self.decks.selected()
    }

    pub fn select_deck(&mut self, deck_id: DeckId) -> bool {
        self.decks.select(deck_id)
    }

    pub fn create_deck(&mut self, name: &str) -> DeckId {
        self.decks.create_deck(name)
    }

    pub fn increment(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        self.decks.increment(deck_id, card_id)
    }

    pub fn decrement(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        self.decks.decrement(deck_id, card_id)
    }

    pub fn remove(&mut self, deck_id: DeckId, card_id: CardId) -> Option<u32> {
        self.decks.remove(deck_id, card_id)
    }

    /// Add to the selected deck, creating a default-named one first if none is selected
    pub fn add_or_prompt_target(&mut self, card_id: CardId) -> (DeckId, u32) {
        let default_name = self.config.default_deck_name.clone();
        self.decks.add_or_prompt_target(card_id, &default_name)
    }

    pub fn count_in_selected(&self, card_id: CardId) -> u32 {
        self.decks.count_in_selected(card_id)
    }

    pub fn deck_cards(&self, deck_id: DeckId) -> Vec<DeckCardEntry> {
        self.decks
            .list(deck_id)
            .map(|list| deck::deck_entries(list, &self.catalog))
            .unwrap_or_default()
    }

    pub fn stats(&self, deck_id: DeckId) -> Option<DeckStats> {
        self.decks
            .list(deck_id)
            .map(|list| stats::compute_stats(list, &self.catalog))
    }

    pub fn validate(&self, deck_id: DeckId) -> Option<DeckValidation> {
        self.decks
            .list(deck_id)
            .map(|list| stats::validate_deck(list, &self.catalog))
    }

    /// Deck text for the clipboard
    pub fn export_deck(&self, deck_id: DeckId) -> Option<String> {
        self.decks
            .list(deck_id)
            .map(|list| codec::export_text(list, &self.catalog))
    }

    /// Import deck text into a new deck and return its id
    pub fn import_deck(&mut self, text: &str) -> DeckId {
        let outcome = codec::import_text_detailed(text, &self.catalog);
        if !outcome.skipped.is_empty() {
            log::info!("Import dropped {} unmatched lines", outcome.skipped.len());
        }
        let name = self.config.imported_deck_name.clone();
        self.decks.create_with_list(&name, outcome.list)
    }

    /// Rename a deck and persist it with its full card list.
    ///
    /// Returns `None` for an unknown deck. A failed write is logged and
    /// reported through [`SaveOutcome::persisted`].
    pub async fn save_deck(&mut self, deck_id: DeckId, name: &str) -> Option<SaveOutcome> {
        if !self.decks.rename(deck_id, name) {
            return None;
        }
        let meta = self.decks.deck(deck_id)?.clone();
        let list = self.decks.list(deck_id)?.clone();

        let persisted = match db::save_deck(&self.db_path, &meta, &list) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist deck {}: {:#}", deck_id, e);
                false
            }
        };

        self.decks.select(deck_id);
        Some(SaveOutcome { deck_id, persisted })
    }

    /// Delete a deck from memory and from the store
    pub async fn delete_deck(&mut self, deck_id: DeckId) -> bool {
        let removed = self.decks.delete_deck(deck_id);
        if let Err(e) = db::delete_deck(&self.db_path, deck_id) {
            log::error!("Failed to delete deck {} from store: {:#}", deck_id, e);
        }
        removed
    }
}

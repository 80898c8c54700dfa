use crate::config::{AppConfig, RemoteSource};
use crate::db;
use crate::error::CatalogError;
use crate::models::{Card, CardId};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Where the cards of a loaded catalog came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogOrigin {
    Cache,
    Remote,
    Bundled,
    Empty,
}

/// Outcome of one attempt against one source
#[derive(Debug)]
pub enum SourceAttempt {
    Loaded(Vec<Card>),
    Failed(CatalogError),
}

impl SourceAttempt {
    fn from_result(result: Result<Vec<Card>, CatalogError>, source_name: &str) -> Self {
        match result {
            Ok(cards) if cards.is_empty() => SourceAttempt::Failed(CatalogError::Empty {
                source_name: source_name.to_string(),
            }),
            Ok(cards) => SourceAttempt::Loaded(cards),
            Err(e) => SourceAttempt::Failed(e),
        }
    }
}

/// Catalog JSON is either a bare array or an object with a `cards` array
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Cards(Vec<Card>),
    Wrapped { cards: Vec<Card> },
}

/// Parse a catalog document
pub fn parse_catalog(json: &str) -> Result<Vec<Card>, CatalogError> {
    let document: CatalogDocument = serde_json::from_str(json)?;
    Ok(match document {
        CatalogDocument::Cards(cards) => cards,
        CatalogDocument::Wrapped { cards } => cards,
    })
}

/// Drop repeated ids, keeping the first occurrence of each
pub fn dedup_cards(cards: Vec<Card>) -> Vec<Card> {
    let mut seen = HashSet::with_capacity(cards.len());
    cards.into_iter().filter(|card| seen.insert(card.id)).collect()
}

/// An immutable, deduplicated card collection with id lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    cards: Vec<Card>,
    positions: HashMap<CardId, usize>,
    origin: CatalogOrigin,
    fingerprint: String,
}

impl Catalog {
    pub fn new(cards: Vec<Card>, origin: CatalogOrigin) -> Self {
        let cards = dedup_cards(cards);
        let positions = cards
            .iter()
            .enumerate()
            .map(|(position, card)| (card.id, position))
            .collect();
        let fingerprint = fingerprint(&cards);

        Self {
            cards,
            positions,
            origin,
            fingerprint,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), CatalogOrigin::Empty)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, card_id: CardId) -> Option<&Card> {
        self.positions.get(&card_id).map(|&position| &self.cards[position])
    }

    pub fn ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|card| card.id).collect()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    /// Content hash, used to tell whether a derived index is stale
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(cards: &[Card]) -> String {
    let mut hasher = Sha256::new();
    for card in cards {
        hasher.update(card.id.to_le_bytes());
        if let Ok(bytes) = serde_json::to_vec(card) {
            hasher.update(&bytes);
        }
    }
    hex::encode(hasher.finalize())
}

/// Loads the card catalog: local cache first, then remote sets, then the bundled file.
///
/// The loaded catalog is memoized; concurrent callers wait on the same load
/// instead of starting their own.
pub struct CatalogLoader {
    db_path: PathBuf,
    remote_sources: Vec<RemoteSource>,
    bundled_catalog: PathBuf,
    client: Client,
    loaded: Mutex<Option<Arc<Catalog>>>,
}

impl CatalogLoader {
    pub fn new(db_path: PathBuf, config: &AppConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            db_path,
            remote_sources: config.remote_sources.clone(),
            bundled_catalog: config.bundled_catalog.clone(),
            client,
            loaded: Mutex::new(None),
        })
    }

    /// Load the catalog once per loader. Never fails: total failure is an empty catalog.
    pub async fn load(&self) -> Arc<Catalog> {
        let mut loaded = self.loaded.lock().await;
        if let Some(catalog) = loaded.as_ref() {
            return Arc::clone(catalog);
        }

        let catalog = Arc::new(self.load_uncached().await);
        log::info!(
            "Catalog ready: {} cards from {:?}",
            catalog.len(),
            catalog.origin()
        );
        *loaded = Some(Arc::clone(&catalog));
        catalog
    }

    async fn load_uncached(&self) -> Catalog {
        match db::load_cached_cards(&self.db_path) {
            Ok(cached) if !cached.is_empty() => {
                log::info!("Using {} cached cards", cached.len());
                return Catalog::new(cached, CatalogOrigin::Cache);
            }
            Ok(_) => log::debug!("Card cache is empty"),
            Err(e) => log::warn!("Failed to read card cache: {}", e),
        }

        let remote = self.load_remote().await;
        if !remote.is_empty() {
            let catalog = Catalog::new(remote, CatalogOrigin::Remote);
            match db::cache_cards(&self.db_path, catalog.cards()) {
                Ok(count) => log::info!("Cached {} cards", count),
                Err(e) => log::error!("Failed to cache cards: {}", e),
            }
            return catalog;
        }

        log::info!(
            "No cards loaded from remote sources, trying bundled catalog {:?}",
            self.bundled_catalog
        );
        match read_bundled(&self.bundled_catalog).await {
            SourceAttempt::Loaded(cards) => {
                log::info!("Loaded {} cards from bundled catalog", cards.len());
                Catalog::new(cards, CatalogOrigin::Bundled)
            }
            SourceAttempt::Failed(e) => {
                log::error!("Failed to load bundled catalog: {}", e);
                Catalog::empty()
            }
        }
    }

    /// Every remote set that loads is appended; a set that fails on all mirrors is skipped
    async fn load_remote(&self) -> Vec<Card> {
        let mut all = Vec::new();
        for source in &self.remote_sources {
            match self.fetch_source(source).await {
                SourceAttempt::Loaded(cards) => {
                    log::info!("Added {} cards from {}", cards.len(), source.label);
                    all.extend(cards);
                }
                SourceAttempt::Failed(e) => {
                    log::warn!("Failed to load set {} from all sources: {}", source.label, e);
                }
            }
        }
        all
    }

    async fn fetch_source(&self, source: &RemoteSource) -> SourceAttempt {
        let mut last = SourceAttempt::Failed(CatalogError::Empty {
            source_name: source.label.clone(),
        });

        for url in &source.urls {
            match self.fetch_url(url).await {
                SourceAttempt::Loaded(cards) => return SourceAttempt::Loaded(cards),
                SourceAttempt::Failed(e) => {
                    log::warn!("Failed to fetch {} from {}: {}", source.label, url, e);
                    last = SourceAttempt::Failed(e);
                }
            }
        }

        last
    }

    async fn fetch_url(&self, url: &str) -> SourceAttempt {
        SourceAttempt::from_result(self.get_cards(url).await, url)
    }

    async fn get_cards(&self, url: &str) -> Result<Vec<Card>, CatalogError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, "lorcana-deck/0.1 (+reqwest)")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CatalogError::Http {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await?;
        parse_catalog(&body)
    }
}

async fn read_bundled(path: &Path) -> SourceAttempt {
    let result = match tokio::fs::read_to_string(path).await {
        Ok(body) => parse_catalog(&body),
        Err(e) => Err(e.into()),
    };
    SourceAttempt::from_result(result, &path.to_string_lossy())
}

use rusqlite::{params, Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_SETS: [&str; 6] = ["TFC", "ROTF", "ITI", "UR", "SDS", "INK"];
const CDN_BASE: &str = "https://cdn.jsdelivr.net/gh/LorcanaJSON/LorcanaJSON@latest/cards";
const GITHUB_BASE: &str = "https://raw.githubusercontent.com/LorcanaJSON/LorcanaJSON/main/EN/cards";

/// One card set and the mirrors it can be downloaded from, tried in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub label: String,
    pub urls: Vec<String>,
}

impl RemoteSource {
    pub fn new(label: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            label: label.into(),
            urls,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote card sets, loaded one after another and concatenated
    pub remote_sources: Vec<RemoteSource>,

    /// Static catalog used only when no remote source yields cards
    pub bundled_catalog: PathBuf,

    /// Per-request timeout; expiry counts as a failed source
    pub fetch_timeout_secs: u64,

    /// Name given to the deck created by the first add with nothing selected
    pub default_deck_name: String,

    #[serde(default = "default_imported_deck_name")]
    pub imported_deck_name: String,
}

fn default_imported_deck_name() -> String {
    "Imported Deck".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_sources: DEFAULT_SETS
                .iter()
                .map(|set| {
                    RemoteSource::new(
                        *set,
                        vec![
                            format!("{}/{}.json", CDN_BASE, set),
                            format!("{}/{}.json", GITHUB_BASE, set),
                        ],
                    )
                })
                .collect(),
            bundled_catalog: PathBuf::from("data/cards.json"),
            fetch_timeout_secs: 15,
            default_deck_name: "Quick Deck".to_string(),
            imported_deck_name: default_imported_deck_name(),
        }
    }
}

pub struct ConfigManager {
    db_path: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl ConfigManager {
    pub fn new(db_path: PathBuf) -> SqliteResult<Self> {
        let config = Arc::new(Mutex::new(AppConfig::default()));
        let manager = Self { db_path, config };

        manager.init_table()?;

        Ok(manager)
    }

    fn get_connection(&self) -> SqliteResult<Connection> {
        Connection::open(&self.db_path)
    }

    fn init_table(&self) -> SqliteResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                remote_sources TEXT NOT NULL,
                bundled_catalog TEXT NOT NULL,
                fetch_timeout_secs INTEGER NOT NULL DEFAULT 15,
                default_deck_name TEXT NOT NULL DEFAULT 'Quick Deck',
                imported_deck_name TEXT NOT NULL DEFAULT 'Imported Deck',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Load settings from database
    pub async fn load(&self) -> SqliteResult<AppConfig> {
        let conn = self.get_connection()?;

        let result: Result<(String, String, i64, String, String), rusqlite::Error> = conn.query_row(
            "SELECT remote_sources, bundled_catalog, fetch_timeout_secs, default_deck_name, imported_deck_name
             FROM settings WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        );

        match result {
            Ok((sources_json, bundled_catalog, timeout, default_deck_name, imported_deck_name)) => {
                let remote_sources: Vec<RemoteSource> = serde_json::from_str(&sources_json)
                    .unwrap_or_else(|e| {
                        log::warn!("Unreadable remote source list, using defaults: {}", e);
                        AppConfig::default().remote_sources
                    });

                let config = AppConfig {
                    remote_sources,
                    bundled_catalog: PathBuf::from(bundled_catalog),
                    fetch_timeout_secs: timeout.max(1) as u64,
                    default_deck_name,
                    imported_deck_name,
                };

                *self.config.lock().await = config.clone();
                Ok(config)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // First run - insert default settings
                let default_config = AppConfig::default();
                self.save(&default_config).await?;
                Ok(default_config)
            }
            Err(e) => Err(e),
        }
    }

    /// Save settings to database
    pub async fn save(&self, config: &AppConfig) -> SqliteResult<()> {
        let conn = self.get_connection()?;

        let sources_json = serde_json::to_string(&config.remote_sources)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let bundled_catalog = config.bundled_catalog.to_string_lossy().to_string();

        let now = chrono::Utc::now().timestamp();

        let updated = conn.execute(
            "UPDATE settings SET
                remote_sources = ?1,
                bundled_catalog = ?2,
                fetch_timeout_secs = ?3,
                default_deck_name = ?4,
                imported_deck_name = ?5,
                updated_at = ?6
            WHERE id = 1",
            params![
                &sources_json,
                &bundled_catalog,
                config.fetch_timeout_secs as i64,
                &config.default_deck_name,
                &config.imported_deck_name,
                now,
            ],
        )?;

        if updated == 0 {
            conn.execute(
                "INSERT INTO settings (id, remote_sources, bundled_catalog, fetch_timeout_secs,
                    default_deck_name, imported_deck_name, created_at, updated_at)
                VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &sources_json,
                    &bundled_catalog,
                    config.fetch_timeout_secs as i64,
                    &config.default_deck_name,
                    &config.imported_deck_name,
                    now,
                    now,
                ],
            )?;
        }

        *self.config.lock().await = config.clone();

        Ok(())
    }

    /// Get current config (from memory)
    pub async fn get(&self) -> AppConfig {
        self.config.lock().await.clone()
    }

    pub async fn update_remote_sources(&self, sources: Vec<RemoteSource>) -> SqliteResult<()> {
        let mut config = self.get().await;
        config.remote_sources = sources;
        self.save(&config).await
    }

    pub async fn update_bundled_catalog(&self, path: PathBuf) -> SqliteResult<()> {
        let mut config = self.get().await;
        config.bundled_catalog = path;
        self.save(&config).await
    }

    pub async fn update_fetch_timeout(&self, secs: u64) -> SqliteResult<()> {
        let mut config = self.get().await;
        config.fetch_timeout_secs = secs.max(1);
        self.save(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_config_default() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        let config = manager.load().await.unwrap();
        assert_eq!(config.default_deck_name, "Quick Deck");
        assert_eq!(config.remote_sources.len(), 6);
        assert_eq!(config.remote_sources[0].label, "TFC");
        assert!(config.remote_sources[0].urls[0].starts_with("https://cdn.jsdelivr.net"));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        let mut config = AppConfig::default();
        config.bundled_catalog = PathBuf::from("/srv/cards.json");
        config.default_deck_name = "Scratch".to_string();

        manager.save(&config).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.bundled_catalog, PathBuf::from("/srv/cards.json"));
        assert_eq!(loaded.default_deck_name, "Scratch");
    }

    #[tokio::test]
    async fn test_config_update_fields() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        manager.load().await.unwrap();

        let sources = vec![RemoteSource::new("local", vec!["http://127.0.0.1:1/cards.json".to_string()])];
        manager.update_remote_sources(sources.clone()).await.unwrap();
        assert_eq!(manager.get().await.remote_sources, sources);

        manager.update_fetch_timeout(0).await.unwrap();
        assert_eq!(manager.get().await.fetch_timeout_secs, 1);

        // A fresh manager reads what was persisted
        let reopened = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();
        let config = reopened.load().await.unwrap();
        assert_eq!(config.remote_sources, sources);
    }
}

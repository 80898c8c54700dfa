use crate::models::{Card, DeckId, DeckList, DeckMeta, MAX_COPIES_PER_CARD};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

/// Initialize the database with all required tables
pub fn init_database(db_path: &Path) -> Result<()> {
    let conn = get_connection(db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    create_schema(&conn)?;

    log::info!("Database initialized successfully");
    Ok(())
}

/// Create all database tables
fn create_schema(conn: &Connection) -> Result<()> {
    // Card cache. The full record is kept as JSON; `position` preserves catalog order.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS decks (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS deck_cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            count INTEGER NOT NULL CHECK (count BETWEEN 1 AND 4),
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE,
            UNIQUE(deck_id, card_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_deck_cards_deck
         ON deck_cards(deck_id)",
        [],
    )?;

    log::info!("Database schema created successfully");
    Ok(())
}

/// Get a database connection with foreign keys enforced
pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path).context("Failed to open database connection")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Read the cached card catalog in catalog order
pub fn load_cached_cards(db_path: &Path) -> Result<Vec<Card>> {
    let conn = get_connection(db_path)?;

    let mut stmt = conn.prepare("SELECT id, data FROM cards ORDER BY position")?;

    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut cards = Vec::with_capacity(rows.len());
    for (id, data) in rows {
        match serde_json::from_str::<Card>(&data) {
            Ok(card) => cards.push(card),
            Err(e) => log::warn!("Skipping unreadable cached card {}: {}", id, e),
        }
    }

    Ok(cards)
}

/// Replace the cached catalog with `cards`
pub fn cache_cards(db_path: &Path, cards: &[Card]) -> Result<usize> {
    let mut conn = get_connection(db_path)?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM cards", [])?;
    {
        let mut stmt =
            tx.prepare("INSERT OR REPLACE INTO cards (id, name, position, data) VALUES (?, ?, ?, ?)")?;
        for (position, card) in cards.iter().enumerate() {
            let data = serde_json::to_string(card).context("Failed to serialize card")?;
            stmt.execute(params![card.id, card.name, position as i64, data])?;
        }
    }

    tx.commit().context("Failed to commit card cache")?;
    Ok(cards.len())
}

/// Persist a deck and its full card list, replacing any earlier snapshot.
///
/// Metadata and rows are written in one transaction, so a failure leaves the
/// previous snapshot untouched rather than a deck without its cards.
pub fn save_deck(db_path: &Path, meta: &DeckMeta, list: &DeckList) -> Result<()> {
    let mut conn = get_connection(db_path)?;
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO decks (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name = ?2, updated_at = ?4",
        params![meta.id, meta.name, meta.created_at, meta.updated_at],
    )?;

    tx.execute("DELETE FROM deck_cards WHERE deck_id = ?", params![meta.id])?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO deck_cards (deck_id, card_id, count) VALUES (?, ?, ?)")?;
        for (card_id, count) in list.iter() {
            stmt.execute(params![meta.id, card_id, count])?;
        }
    }

    tx.commit()
        .with_context(|| format!("Failed to commit deck {}", meta.id))?;

    log::info!(
        "Saved deck {} ({}) with {} distinct cards",
        meta.id,
        meta.name,
        list.len()
    );
    Ok(())
}

/// Load every saved deck with its card list, oldest first
pub fn load_decks(db_path: &Path) -> Result<Vec<(DeckMeta, DeckList)>> {
    let conn = get_connection(db_path)?;

    let mut stmt =
        conn.prepare("SELECT id, name, created_at, updated_at FROM decks ORDER BY created_at, id")?;
    let metas: Vec<DeckMeta> = stmt
        .query_map([], |row| {
            Ok(DeckMeta {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT deck_id, card_id, count FROM deck_cards")?;
    let rows: Vec<(DeckId, i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut grouped: HashMap<DeckId, Vec<(i64, u32)>> = HashMap::new();
    for (deck_id, card_id, count) in rows {
        let count = count.clamp(0, MAX_COPIES_PER_CARD as i64) as u32;
        grouped.entry(deck_id).or_default().push((card_id, count));
    }

    Ok(metas
        .into_iter()
        .map(|meta| {
            let list = grouped.remove(&meta.id).unwrap_or_default().into_iter().collect();
            (meta, list)
        })
        .collect())
}

/// Delete a saved deck; its card rows go with it
pub fn delete_deck(db_path: &Path, deck_id: DeckId) -> Result<bool> {
    let conn = get_connection(db_path)?;
    let deleted = conn.execute("DELETE FROM decks WHERE id = ?", params![deck_id])?;
    Ok(deleted > 0)
}

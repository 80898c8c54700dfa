use crate::catalog::Catalog;
use crate::models::CardId;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

/// Column weights for bm25, in table column order: name, subtitle, then the rest
const RANK_SQL: &str = "SELECT rowid, bm25(cards_fts, 5.0, 3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0) AS score
     FROM cards_fts
     WHERE cards_fts MATCH ?
     ORDER BY score, rowid";

/// A ranked match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub card_id: CardId,
    /// Higher is better
    pub score: f64,
}

/// Lowercased alphanumeric runs
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// FTS5 expression: every term as a quoted prefix, implicitly ANDed
fn match_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|term| format!("\"{}\"*", term))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full-text index over a whole catalog, held in an in-memory FTS5 table.
///
/// Built in one pass and never updated in place; when the catalog changes a
/// new index is built. `fingerprint` records which catalog it was built from.
#[derive(Debug)]
pub struct SearchIndex {
    fingerprint: String,
    ids: Vec<CardId>,
    conn: Connection,
}

/// Build a fresh index over every card in `catalog`
pub fn build_index(catalog: &Catalog) -> Result<SearchIndex> {
    let mut conn = Connection::open_in_memory().context("Failed to open search index")?;

    conn.execute(
        "CREATE VIRTUAL TABLE cards_fts USING fts5(
            name,
            subtitle,
            text,
            card_type,
            classifications,
            card_set,
            ink,
            rarity,
            prefix = '2 3',
            tokenize = 'unicode61'
        )",
        [],
    )?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO cards_fts (rowid, name, subtitle, text, card_type, classifications, card_set, ink, rarity)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        for card in catalog.cards() {
            stmt.execute(params![
                card.id,
                card.name,
                card.subtitle.as_deref().unwrap_or(""),
                card.text,
                card.card_type,
                card.classifications.join(" "),
                card.set,
                card.ink,
                card.rarity,
            ])?;
        }
    }
    tx.commit().context("Failed to commit search index")?;

    log::info!("Built search index: {} cards", catalog.len());

    Ok(SearchIndex {
        fingerprint: catalog.fingerprint().to_string(),
        ids: catalog.ids(),
        conn,
    })
}

impl SearchIndex {
    /// Whether this index was built from `catalog`
    pub fn is_current(&self, catalog: &Catalog) -> bool {
        self.fingerprint == catalog.fingerprint()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Card ids ordered by relevance. An empty query matches every card in catalog order.
    pub fn search(&self, query: &str) -> Result<Vec<CardId>> {
        Ok(self
            .search_scored(query)?
            .into_iter()
            .map(|hit| hit.card_id)
            .collect())
    }

    /// Ranked hits. Every query term must prefix-match at least one field of a card.
    pub fn search_scored(&self, query: &str) -> Result<Vec<SearchHit>> {
        let terms = tokenize(query);

        if terms.is_empty() {
            return Ok(self
                .ids
                .iter()
                .map(|&card_id| SearchHit { card_id, score: 0.0 })
                .collect());
        }

        let mut stmt = self.conn.prepare(RANK_SQL)?;
        let hits: Vec<SearchHit> = stmt
            .query_map(params![match_expression(&terms)], |row| {
                let bm25: f64 = row.get(1)?;
                Ok(SearchHit {
                    card_id: row.get(0)?,
                    score: -bm25,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Search '{}' matched {} cards", query, hits.len());
        Ok(hits)
    }
}

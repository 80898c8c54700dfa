use anyhow::{Context, Result};
use lorcana_deck::stats::format_cost;
use lorcana_deck::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let db_path = dirs::data_dir()
        .context("Failed to get app data dir")?
        .join("lorcana-deck")
        .join("lorcana.db");

    log::info!("Database path: {:?}", db_path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut state = AppState::open(db_path).await?;
    let catalog = state.load_catalog().await;

    log::info!(
        "Lorcana deck builder initialized: {} cards ({:?}), {} saved decks",
        catalog.len(),
        catalog.origin(),
        state.decks().len()
    );

    // Anything on the command line is treated as a search query
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.is_empty() {
        state.set_query(&query);
        for card in state.results() {
            println!(
                "{:>3}  {:<8} {}",
                format_cost(card.ink_cost),
                card.ink,
                card.display_name()
            );
        }
    }

    Ok(())
}

pub mod catalog;
pub mod codec;
pub mod config;
pub mod db;
pub mod deck;
pub mod error;
pub mod filter;
pub mod models;
pub mod search;
pub mod state;
pub mod stats;

pub use state::{AppState, SaveOutcome};

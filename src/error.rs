use thiserror::Error;

/// Why a single catalog source could not provide cards.
///
/// None of these are fatal: the loader logs them and moves on to the next
/// source, ending with the bundled file.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request error: {0}")]
    Request(Box<reqwest::Error>),

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("Source {source_name} returned no cards")]
    Empty { source_name: String },
}

impl From<std::io::Error> for CatalogError {
    fn from(error: std::io::Error) -> Self {
        CatalogError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(error: reqwest::Error) -> Self {
        match error.url() {
            Some(url) if error.is_timeout() => CatalogError::Timeout {
                url: url.to_string(),
            },
            _ => CatalogError::Request(Box::new(error)),
        }
    }
}

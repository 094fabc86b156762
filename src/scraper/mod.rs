pub mod cleaner;
pub mod http_client;
pub mod info_line;
pub mod parsers;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use self::http_client::HttpClient;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failures that invalidate a whole page. Missing optional fields are not
/// errors; they come back as `None`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot derive game_id from href {href:?}")]
    InvalidGameId { href: String },

    #[error("invalid selector {0}")]
    Selector(String),
}

// ── Fetcher trait ─────────────────────────────────────────────────────────────

/// A fetched page. `url` is where the body actually came from, after any
/// redirects; links on the page resolve against it.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

/// Swappable page source: the HTTP client in production, canned pages in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

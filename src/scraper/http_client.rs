use crate::config::CrawlerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use super::{FetchedPage, PageFetcher};

#[derive(Debug)]
enum FetchError {
    /// Worth another attempt: transport errors, 429 and 5xx.
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    fn into_inner(self) -> anyhow::Error {
        match self {
            FetchError::Transient(e) | FetchError::Fatal(e) => e,
        }
    }
}

pub struct HttpClient {
    inner: reqwest::Client,
    config: CrawlerConfig,
}

impl HttpClient {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with politeness delay and retry.
    pub async fn get_text(&self, url: &str) -> Result<FetchedPage> {
        self.polite_delay().await;

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.request_delay_ms.max(2) / 2)
            .max_delay(Duration::from_secs(60))
            .map(jitter)
            .take(self.config.max_retries as usize);

        let mut attempt = 0u32;
        RetryIf::start(
            strategy,
            || {
                attempt += 1;
                self.attempt(url, attempt)
            },
            FetchError::is_transient,
        )
        .await
        .map_err(FetchError::into_inner)
        .with_context(|| format!("All retries exhausted for {}", url))
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Result<FetchedPage, FetchError> {
        debug!("GET {} (attempt {})", url, attempt);

        let resp = match self.inner.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Request failed on attempt {}: {}", attempt, e);
                return Err(FetchError::Transient(anyhow::anyhow!("Request error: {}", e)));
            }
        };

        let status = resp.status();
        if status.is_success() {
            let final_url = resp.url().to_string();
            if final_url != url {
                debug!("{} redirected to {}", url, final_url);
            }
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::Transient(anyhow::anyhow!("Failed to read response body: {}", e)))?;
            return Ok(FetchedPage { url: final_url, body });
        }

        if is_retryable(status) {
            warn!("{} on attempt {} for {}", status, attempt, url);
            Err(FetchError::Transient(anyhow::anyhow!("HTTP {}", status)))
        } else {
            Err(FetchError::Fatal(anyhow::anyhow!("HTTP error {}", status)))
        }
    }

    /// Sleep for the configured delay plus random jitter.
    async fn polite_delay(&self) {
        let base = Duration::from_millis(self.config.request_delay_ms);
        let extra = jitter(Duration::from_millis(self.config.jitter_ms));
        sleep(base + extra).await;
    }
}

/// Rate limiting and server-side failures are worth another attempt; any
/// other non-success status is final.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.get_text(url).await
    }
}

//! Crawl orchestrator: fetch queue → stage handlers → record sink.
//!
//! ## Flow
//!
//! 1. Seed requests (competition pages) go on a FIFO queue.
//! 2. Every queued request is spawned as a fetch task; a semaphore caps how
//!    many are in flight at once (`crawler.concurrency`).
//! 3. As fetches complete (in whatever order), the page is parsed and handed
//!    to the stage named by the request's context. Follow-up links are
//!    resolved against the final page URL (after redirects) and queued;
//!    records go to the sink.
//!
//! A failed fetch or a page without a usable `game_id` ends only that branch.
//! Cancelling (Ctrl-C) aborts in-flight fetches and drops their contexts.

use crate::config::CrawlerConfig;
use crate::models::Request;
use crate::scraper::{ExtractError, FetchedPage, PageFetcher};
use crate::stages::{self, Outcome};
use crate::storage::RecordSink;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::Html;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

pub struct Pipeline {
    config: CrawlerConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl Pipeline {
    pub fn new(config: CrawlerConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Crawl until the queue drains or `shutdown` resolves.
    pub async fn run(
        &self,
        seeds: Vec<Request>,
        sink: &mut dyn RecordSink,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::new();
        let mut frontier = Frontier::new(self.config.dedupe_requests);
        for seed in seeds {
            frontier.push(seed, &mut stats);
        }

        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<(Request, Result<FetchedPage>)> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            while let Some(request) = frontier.pop() {
                let fetcher = Arc::clone(&self.fetcher);
                let sem = Arc::clone(&sem);

                tasks.spawn(async move {
                    let body: Result<FetchedPage> = async {
                        let _permit = sem.acquire_owned().await?;
                        fetcher.fetch(&request.url).await
                    }
                    .await;
                    (request, body)
                });
            }

            let joined = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    stats.cancelled = tasks.len();
                    warn!("Shutdown requested, abandoning {} pending fetches", stats.cancelled);
                    tasks.abort_all();
                    break;
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };

            let (request, body) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!("Fetch task panic: {}", e);
                    stats.fetch_errors += 1;
                    continue;
                }
            };

            let fetched = match body {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("{}: {:#}", request.url, e);
                    stats.fetch_errors += 1;
                    continue;
                }
            };
            stats.pages_fetched += 1;

            let page_url = fetched.url;
            let stage = request.context.stage_name();
            let origin = origin_href(&request.context);

            let outcome = match dispatch(request, &fetched.body) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("{}: {} page dropped (from {}): {}", page_url, stage, origin, e);
                    stats.records_dropped += 1;
                    continue;
                }
            };

            for follow in outcome.requests {
                match resolve(&page_url, &follow.url) {
                    Ok(url) => frontier.push(Request { url, ..follow }, &mut stats),
                    Err(e) => warn!("{}: {:#}", page_url, e),
                }
            }

            for record in &outcome.records {
                debug!("game {} <- {}", record.game_id, record.href());
                sink.emit(record)
                    .with_context(|| format!("emit game {}", record.game_id))?;
                stats.records_emitted += 1;
            }
        }

        sink.flush()?;
        stats.finished_at = Utc::now();

        info!(
            "Crawl finished: {} pages | {} records | {} dropped | {} fetch errors | {} duplicates",
            stats.pages_fetched,
            stats.records_emitted,
            stats.records_dropped,
            stats.fetch_errors,
            stats.duplicates_skipped,
        );

        Ok(stats)
    }
}

/// Parse the page and run its stage. Kept synchronous so the parsed
/// document never lives across an await.
fn dispatch(request: Request, body: &str) -> Result<Outcome, ExtractError> {
    let page = Html::parse_document(body);
    stages::handle(&page, &request.url, request.context)
}

/// Href of the outermost ancestor, i.e. the item the crawl was seeded with.
fn origin_href(context: &crate::models::Context) -> String {
    context
        .ancestors()
        .last()
        .and_then(|v| v.get("href"))
        .and_then(|v| v.as_str())
        .unwrap_or("<seed>")
        .to_string()
}

/// Resolve a link found on `page_url` the way a browser would.
fn resolve(page_url: &str, href: &str) -> Result<String> {
    let base = Url::parse(page_url).with_context(|| format!("Invalid page URL {:?}", page_url))?;
    let url = base
        .join(href)
        .with_context(|| format!("Cannot resolve {:?}", href))?;
    Ok(url.to_string())
}

// ── Queue ─────────────────────────────────────────────────────────────────────

struct Frontier {
    queue: VecDeque<Request>,
    seen: Option<HashSet<String>>,
}

impl Frontier {
    fn new(dedupe: bool) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: dedupe.then(HashSet::new),
        }
    }

    fn push(&mut self, request: Request, stats: &mut PipelineStats) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(request.url.clone()) {
                debug!("Duplicate request skipped: {}", request.url);
                stats.duplicates_skipped += 1;
                return;
            }
        }
        stats.requests_enqueued += 1;
        self.queue.push_back(request);
    }

    fn pop(&mut self) -> Option<Request> {
        self.queue.pop_front()
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PipelineStats {
    pub requests_enqueued: usize,
    pub pages_fetched: usize,
    pub records_emitted: usize,
    pub records_dropped: usize,
    pub fetch_errors: usize,
    pub duplicates_skipped: usize,
    pub cancelled: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineStats {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            requests_enqueued: 0,
            pages_fetched: 0,
            records_emitted: 0,
            records_dropped: 0,
            fetch_errors: 0,
            duplicates_skipped: 0,
            cancelled: 0,
            started_at: now,
            finished_at: now,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

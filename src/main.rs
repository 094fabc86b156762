mod config;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod stages;
mod storage;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::loader::{load_parents, parent_from_url, seed_requests};
use crate::models::MatchContext;
use crate::pipeline::Pipeline;
use crate::scraper::HttpClient;
use crate::storage::{JsonLinesSink, RecordSink};

#[derive(Parser)]
#[command(name = "tfmkt-games", about = "Crawl match records competition by competition", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl competitions → fixture lists → matches, writing one JSON record per match
    Crawl {
        /// JSON-lines file of parent competition items ("-" for stdin)
        #[arg(short, long, conflicts_with = "url", required_unless_present = "url")]
        parents: Option<PathBuf>,

        /// Single competition page to start from
        #[arg(short, long)]
        url: Option<String>,

        /// Season to crawl, e.g. 2020 for 2020/21
        #[arg(short, long, env = "TFMKT_SEASON")]
        season: Option<u16>,

        /// Output file (default: config output.path, else stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the match-page extractor on a saved HTML file
    ExtractGame {
        /// Saved match page
        file: PathBuf,

        /// Href the page was fetched from; its last segment is the game id
        #[arg(long)]
        href: String,
    },

    /// Fetch each stage's sample page and check its contract
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "tfmkt_games=info,warn",
        1 => "tfmkt_games=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { parents, url, season, output } => {
            let parents = match parents {
                Some(path) => load_parents(&path)?,
                None => vec![parent_from_url(url.as_deref().context("--parents or --url is required")?)],
            };
            let seeds = seed_requests(parents, &config.crawler.base_url, season)?;
            info!("{} competitions to crawl", seeds.len());

            let mut sink: Box<dyn RecordSink> = match output.or(config.output.path.clone()) {
                Some(path) => Box::new(JsonLinesSink::create(&path)?),
                None => Box::new(JsonLinesSink::stdout()),
            };

            let fetcher = Arc::new(HttpClient::new(&config.crawler)?);
            let pipeline = Pipeline::new(config.crawler.clone(), fetcher);

            let stats = pipeline.run(seeds, sink.as_mut(), shutdown_signal()).await?;
            info!(
                "Done: {} records, {} dropped, {} fetch errors, {} cancelled in {:.1}s",
                stats.records_emitted,
                stats.records_dropped,
                stats.fetch_errors,
                stats.cancelled,
                (stats.finished_at - stats.started_at).num_milliseconds() as f64 / 1000.0,
            );
        }

        Command::ExtractGame { file, href } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let page = ::scraper::Html::parse_document(&html);
            let ctx = MatchContext { parent: serde_json::json!({}), href };

            let record = stages::parse_game(&page, ctx)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Command::Check => {
            let client = HttpClient::new(&config.crawler)?;
            let mut failures = 0usize;

            for contract in stages::contracts::all() {
                let verdict = match client.get_text(contract.url).await {
                    Ok(page) => check_page(&contract, &page.body),
                    Err(e) => Err(e),
                };

                match verdict {
                    Ok(()) => println!("  ok    {}", contract.stage),
                    Err(e) => {
                        error!("{}: {:#}", contract.stage, e);
                        println!("  FAIL  {}", contract.stage);
                        failures += 1;
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} contract(s) failed", failures);
            }
        }
    }

    Ok(())
}

fn check_page(contract: &stages::contracts::Contract, html: &str) -> Result<()> {
    let page = ::scraper::Html::parse_document(html);
    let outcome = stages::handle(&page, contract.url, contract.context())?;
    contract.verify(&outcome)?;
    Ok(())
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

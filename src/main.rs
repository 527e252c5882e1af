//! macronews — batch entrypoint.
//! Invoked by an external scheduler; each subcommand is one short-lived
//! run coordinated entirely through the durable store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use macronews::config::AppConfig;
use macronews::ingest::catalog::Catalog;
use macronews::ingest::rss::RssProvider;
use macronews::ingest::types::SourceProvider;
use macronews::lexicon::Lexicon;
use macronews::queue::{self, QueuePolicy};
use macronews::rewrite;
use macronews::store;

#[derive(Parser)]
#[command(name = "macronews", version, about = "Macroeconomic news ingestion and rewrite pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema and verify store connectivity.
    Init,
    /// Fetch all configured sources and run the ingestion pipeline.
    Fetch {
        /// Restrict to one source category.
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Queue eligible high-priority stories for rewriting.
    Queue {
        #[arg(long, short = 's')]
        min_score: Option<f64>,
        #[arg(long, short)]
        limit: Option<u32>,
    },
    /// Sweep stale entries and drain one batch of the rewrite queue.
    Process {
        #[arg(long, short)]
        limit: Option<u32>,
    },
    /// Corpus and queue counts.
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn print_report<T: serde::Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in deployed environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load_default().context("loading configuration")?;

    // An unreachable store is the one batch-wide fatal error; everything
    // per-candidate/per-entry is absorbed into the run reports.
    let store = store::connect(&cfg.database)
        .await
        .context("connecting to the store")?;
    store.init_schema().await.context("initializing schema")?;

    match cli.command {
        Command::Init => {
            tracing::info!("schema ready");
        }

        Command::Fetch { category } => {
            let lexicon = Lexicon::load_default().context("loading lexicon")?;
            let catalog = Catalog::load_default().context("loading source catalog")?;

            let client = reqwest::Client::builder()
                .user_agent(cfg.fetch.user_agent.clone())
                .timeout(Duration::from_secs(cfg.fetch.request_timeout_secs))
                .build()
                .context("building http client")?;

            let providers: Vec<Box<dyn SourceProvider>> = catalog
                .enabled(category.as_deref())
                .into_iter()
                .map(|spec| {
                    Box::new(RssProvider::from_spec(spec.clone(), client.clone()))
                        as Box<dyn SourceProvider>
                })
                .collect();

            let report = macronews::ingest::run_fetch(store.as_ref(), &lexicon, &providers).await;
            print_report(&report)?;
        }

        Command::Queue { min_score, limit } => {
            let lexicon = Lexicon::load_default().context("loading lexicon")?;
            let min_score = min_score.unwrap_or(lexicon.threshold);
            let limit = limit.unwrap_or(cfg.queue.enqueue_limit);

            let report = queue::enqueue(store.as_ref(), min_score, limit).await?;
            print_report(&report)?;
        }

        Command::Process { limit } => {
            let limit = limit.unwrap_or(cfg.queue.process_limit);
            let rewriter = rewrite::build_rewriter(cfg.queue.rewrite_timeout())
                .context("building rewrite provider")?;
            let policy = QueuePolicy {
                max_attempts: cfg.queue.max_attempts,
                stale_after: cfg.queue.stale_after(),
                rewrite_timeout: cfg.queue.rewrite_timeout(),
            };

            let report =
                queue::process_queue(store.as_ref(), rewriter.as_ref(), limit, policy).await?;
            print_report(&report)?;
        }

        Command::Stats => {
            let stats = store.stats().await?;
            print_report(&stats)?;
        }
    }

    Ok(())
}

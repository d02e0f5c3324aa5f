//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet crawler.

use anyhow::Context;
use clap::Parser;
use driftnet::config::{load_config, Config};
use driftnet::crawler::{Channel, CrawlEvent, Crawler, DomainFilter};
use driftnet::output::{print_statistics, print_stored_statistics, CrawlStats};
use driftnet::storage::{PageRecord, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

/// Driftnet: a polite, event-driven web crawler
///
/// Driftnet crawls outward from its seed URLs while honoring robots.txt
/// rules, sitemaps and a fixed politeness delay, and stores every crawled
/// page in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A polite, event-driven web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl instead of the configured seeds (repeatable)
    #[arg(long, value_name = "URL")]
    seed: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding the saved frontier
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if !cli.seed.is_empty() {
        config.seeds = cli.seed.clone();
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.fresh, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Delay: {}ms", config.crawler.delay);
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    println!("  Honor bot rules: {}", config.crawler.honor_bot_rules);
    println!("  Only follow sitemap: {}", config.crawler.only_follow_sitemap);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    if let Some(contact) = &config.user_agent.contact_url {
        println!("  Contact URL: {}", contact);
    }

    println!("\nFilter:");
    println!("  Allow: {:?}", config.filter.allow);
    println!("  Deny: {:?}", config.filter.deny);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    print_stored_statistics(&storage)?;

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool, quiet: bool) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;
    let storage = Arc::new(Mutex::new(storage));

    let crawler = Crawler::builder(config.crawler.clone())
        .user_agent(config.user_agent.clone())
        .filter(DomainFilter::from_config(&config.filter))
        .build()?;

    let stats = CrawlStats::attach(&crawler);
    attach_persister(&crawler, Arc::clone(&storage));

    {
        let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
        if fresh {
            tracing::info!("Starting fresh crawl (discarding saved frontier)");
            storage.clear_snapshot()?;
        } else {
            let snapshot = storage.load_snapshot()?;
            if !snapshot.frontier.is_empty() || !snapshot.visited.is_empty() {
                crawler.restore(snapshot);
            }
        }
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let crawler = crawler.clone();
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current URL");
                interrupted.store(true, Ordering::SeqCst);
                crawler.stop();
            }
        });
    }

    tracing::info!("Seed URLs: {}", config.seeds.len());
    if config.seeds.is_empty() {
        crawler.start(None).await?;
    }
    for seed in &config.seeds {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = crawler.start(Some(seed.as_str())).await {
            tracing::error!("Skipping seed: {}", e);
        }
    }

    let snapshot = crawler.snapshot();
    tracing::info!(
        "Saving frontier: {} pending, {} visited",
        snapshot.frontier.len(),
        snapshot.visited.len()
    );
    storage
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .save_snapshot(&snapshot)?;

    if !quiet {
        println!();
        print_statistics(&stats.snapshot());
    }

    Ok(())
}

/// Stores every page delivered on `after-crawl`
fn attach_persister(crawler: &Crawler, storage: Arc<Mutex<SqliteStorage>>) {
    crawler.on(Channel::AfterCrawl, move |event| {
        let CrawlEvent::AfterCrawl(page) = event else {
            return;
        };
        let record = PageRecord::from_crawled(page);
        let result = storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put_page(&record);
        if let Err(e) = result {
            tracing::error!("Failed to store {}: {}", record.url, e);
        }
    });
}

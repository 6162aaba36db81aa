//! Suruga-Watch main entry point
//!
//! This is the command-line interface for the Suruga-ya listing watcher.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use suruga_watch::config::{load_config_with_hash, Config};
use suruga_watch::crawler::Coordinator;
use suruga_watch::output::{load_statistics, print_statistics, JsonLinesSink};
use suruga_watch::storage::SqliteStorage;
use suruga_watch::{WatchOutcome, Watcher};
use tracing_subscriber::EnvFilter;

/// Suruga-Watch: new-product watcher for Suruga-ya listings
///
/// Suruga-Watch crawls a product search on suruga-ya.com, remembers every
/// product it has seen, and posts newly listed products to a webhook.
#[derive(Parser, Debug)]
#[command(name = "suruga-watch")]
#[command(version)]
#[command(about = "Watches Suruga-ya listings for new products", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single watch tick and exit
    #[arg(long, conflicts_with_all = ["dump", "dry_run", "stats"])]
    once: bool,

    /// Crawl the listing and write its records as JSON lines
    #[arg(long, conflicts_with_all = ["once", "dry_run", "stats"])]
    dump: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["once", "dump", "stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["once", "dump", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context(format!("cannot load {}", cli.config.display()));
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.dump {
        handle_dump(&config).await?;
    } else if cli.once {
        handle_once(config, config_hash).await?;
    } else {
        handle_watch(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("suruga_watch=info,warn"),
            1 => EnvFilter::new("suruga_watch=debug,info"),
            2 => EnvFilter::new("suruga_watch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so that `--dump` can stream records on stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let start_url = config.search.start_url()?;

    println!("=== Suruga-Watch Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Request delay: {}ms", config.crawler.request_delay);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSearch:");
    println!("  Keyword: {}", config.search.keyword);
    println!(
        "  Category: {}",
        config.search.category.as_deref().unwrap_or("(any)")
    );
    println!("  Sort: {}", config.search.sort);
    println!("  Start URL: {}", start_url);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!(
        "  Records: {}",
        config.output.records_path.as_deref().unwrap_or("(stdout)")
    );

    println!("\nNotifications:");
    match &config.notify.webhook_url {
        Some(_) => println!("  Webhook: configured"),
        None => println!("  Webhook: (none, new products are only logged)"),
    }
    println!("  Interval: {} minutes", config.notify.interval_minutes);
    println!("  Batch size: {}", config.notify.batch_size);

    println!("\nSelectors:");
    for (name, selector) in config.selectors.entries() {
        println!("  {}: {}", name, selector);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", start_url);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the --dump mode: crawls once and writes every record as JSON lines
async fn handle_dump(config: &Config) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::new(config)?;

    let (report, written) = match &config.output.records_path {
        Some(path) => {
            let mut sink = JsonLinesSink::create(Path::new(path))
                .with_context(|| format!("cannot create {}", path))?;
            let report = coordinator.run(&mut sink).await?;
            tracing::info!("Records written to {}", path);
            (report, sink.written())
        }
        None => {
            let mut sink = JsonLinesSink::stdout();
            let report = coordinator.run(&mut sink).await?;
            (report, sink.written())
        }
    };

    tracing::info!(
        "Dumped {} records from {} pages ({} failed)",
        written,
        report.pages_fetched,
        report.pages_failed
    );

    Ok(())
}

/// Handles the --once mode: a single watch tick
async fn handle_once(config: Config, config_hash: String) -> anyhow::Result<()> {
    let mut watcher = Watcher::new(config, config_hash)?;

    match watcher.run_once().await {
        Ok(WatchOutcome::Seeded { products }) => {
            tracing::info!("Stored {} products as the initial state", products);
            Ok(())
        }
        Ok(WatchOutcome::Compared { new }) => {
            tracing::info!("Watch run completed, {} new products", new);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Watch run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the default mode: watches until interrupted
async fn handle_watch(config: Config, config_hash: String) -> anyhow::Result<()> {
    let mut watcher = Watcher::new(config, config_hash)?;
    watcher.run_forever().await?;
    tracing::info!("Watcher stopped");
    Ok(())
}

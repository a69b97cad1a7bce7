//! Ripple-Harvest main entry point
//!
//! This is the command-line interface for the Ripple-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use ripple_harvest::config::{compute_config_hash, parse_config, validate, Config, Mode, Preset};
use ripple_harvest::output::print_report;
use ripple_harvest::search::build_multi_query_urls;
use ripple_harvest::Orchestrator;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ripple-Harvest: a polite, resumable web crawler
///
/// Crawls from seed URLs and search queries while respecting robots.txt and
/// per-domain pacing, writing one JSON record per extracted page and a final
/// JSON report.
#[derive(Parser, Debug)]
#[command(name = "ripple-harvest")]
#[command(version)]
#[command(about = "A polite, resumable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Search query expanded into result pages (repeatable)
    #[arg(long = "query", value_name = "TEXT")]
    queries: Vec<String>,

    /// Named preset filling mode, page budget, concurrency and robots flag
    #[arg(long)]
    preset: Option<Preset>,

    /// Crawl mode: normal, wide or deep
    #[arg(long)]
    mode: Option<Mode>,

    /// Maximum number of pages to process
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum number of concurrent fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Minimum milliseconds between requests to the same host
    #[arg(long = "delay-ms")]
    per_domain_delay_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout-secs")]
    request_timeout_secs: Option<u64>,

    /// Ignore robots.txt
    #[arg(long)]
    no_robots: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// JSON Lines output file
    #[arg(long = "output", value_name = "PATH")]
    output_path: Option<PathBuf>,

    /// JSON report file
    #[arg(long = "report", value_name = "PATH")]
    report_path: Option<PathBuf>,

    /// SQLite raw-page cache file
    #[arg(long = "cache", value_name = "PATH")]
    cache_path: Option<PathBuf>,

    /// Checkpoint file
    #[arg(long = "checkpoint", value_name = "PATH")]
    checkpoint_path: Option<PathBuf>,

    /// Pages between checkpoints
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Directory of <host>.toml extraction plugins
    #[arg(long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Resume from the checkpoint file if it exists
    #[arg(long)]
    resume: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(config);
        return Ok(());
    }

    handle_crawl(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_harvest=info,warn"),
            1 => EnvFilter::new("ripple_harvest=debug,info"),
            2 => EnvFilter::new("ripple_harvest=trace,debug"),
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

/// Builds the configuration: file (or defaults), then preset, then flags
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config = parse_config(&content)?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(preset) = cli.preset {
        preset.apply(&mut config.crawler);
    }

    config.seeds.extend(cli.seeds.iter().cloned());
    config.queries.extend(cli.queries.iter().cloned());

    let crawler = &mut config.crawler;
    if let Some(mode) = cli.mode {
        crawler.mode = mode;
    }
    if let Some(max_pages) = cli.max_pages {
        crawler.max_pages = max_pages;
    }
    if let Some(concurrency) = cli.concurrency {
        crawler.concurrency = concurrency;
    }
    if let Some(delay) = cli.per_domain_delay_ms {
        crawler.per_domain_delay_ms = delay;
    }
    if let Some(timeout) = cli.request_timeout_secs {
        crawler.request_timeout_secs = timeout;
    }
    if cli.no_robots {
        crawler.respect_robots = false;
    }
    if cli.insecure {
        crawler.verify_ssl = false;
    }
    if cli.resume {
        crawler.resume = true;
    }

    let output = &mut config.output;
    if let Some(path) = &cli.output_path {
        output.output_path = path.clone();
    }
    if let Some(path) = &cli.report_path {
        output.report_path = path.clone();
    }
    if let Some(path) = &cli.cache_path {
        output.cache_path = Some(path.clone());
    }
    if let Some(path) = &cli.checkpoint_path {
        output.checkpoint_path = Some(path.clone());
    }
    if let Some(every) = cli.checkpoint_every {
        output.checkpoint_every = every;
    }
    if let Some(dir) = &cli.plugin_dir {
        output.plugin_dir = Some(dir.clone());
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(mut config: Config) {
    let link_limit = config.apply_mode_policy();
    let search_urls = build_multi_query_urls(&config.queries);

    println!("=== Ripple-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Mode: {} (link limit {})", config.crawler.mode, link_limit);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Per-domain delay: {}ms", config.crawler.per_domain_delay_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Verify SSL: {}", config.crawler.verify_ssl);
    println!("  Resume: {}", config.crawler.resume);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Records: {}", config.output.output_path.display());
    println!("  Report: {}", config.output.report_path.display());
    if let Some(path) = &config.output.cache_path {
        println!("  Cache: {}", path.display());
    }
    if let Some(path) = &config.output.checkpoint_path {
        println!(
            "  Checkpoint: {} (every {} pages)",
            path.display(),
            config.output.checkpoint_every
        );
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\nSearch URLs ({}):", search_urls.len());
    for url in &search_urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current batch");
            signal_token.cancel();
        }
    });

    let orchestrator = Orchestrator::new(config).context("failed to start crawl")?;
    let report = orchestrator.run(cancel).await.context("crawl failed")?;

    if !quiet {
        print_report(&report);
    }

    Ok(())
}

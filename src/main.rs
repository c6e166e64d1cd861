//! Moto-Harvest main entry point
//!
//! This is the command-line interface for the dealer catalog crawler and
//! content store importer.

use anyhow::Context;
use clap::Parser;
use moto_harvest::config::{load_config_with_hash, Config, MAX_PAGES};
use moto_harvest::crawler::DealerSite;
use moto_harvest::listing::{CrawlResponse, ErrorResponse, ImportResponse};
use moto_harvest::output::{
    print_crawl_summary, print_import_summary, write_payload, CrawlSummary, ImportSummary,
};
use moto_harvest::{parse_import_request, run_crawl, run_import, HarvestError, ImportEntry};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Moto-Harvest: dealer catalog crawler and importer
///
/// Without `--import`, crawls the configured dealer catalog and writes the
/// scraped listings as `{ "bikes": [...] }`. With `--import`, reads such a
/// payload and creates one content store document per listing.
#[derive(Parser, Debug)]
#[command(name = "moto-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Dealer catalog crawler and content store importer", long_about = None)]
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

    /// Validate config and show what would be crawled without any network I/O
    #[arg(long)]
    dry_run: bool,

    /// Write the JSON payload to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Import listings from a `{ "bikes": [...] }` file instead of crawling
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    import: Option<PathBuf>,

    /// Import only listings marked as selected
    #[arg(long, requires = "import")]
    only_selected: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // The write token usually lives in .env
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env file: {}", e),
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if let Some(import_path) = &cli.import {
        handle_import(
            &config,
            import_path,
            cli.only_selected,
            cli.output.as_deref(),
            cli.quiet,
        )
        .await?;
    } else {
        handle_crawl(&config, cli.output.as_deref(), cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("moto_harvest=info,warn"),
            1 => EnvFilter::new("moto_harvest=debug,info"),
            2 => EnvFilter::new("moto_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would happen
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let site = DealerSite::from_config(config)?;
    let store = &config.content_store;

    println!("=== Moto-Harvest Dry Run ===\n");

    println!("Source:");
    println!("  Origin: {}", config.source.origin);
    println!("  Dealer: {}", config.source.dealer_path);
    println!(
        "  Max pages: {} (ceiling {})",
        config.source.max_pages, MAX_PAGES
    );
    println!(
        "  Detail fetches per batch: {}",
        config.source.detail_concurrency
    );
    println!("  Page retries: {}", config.source.page_retries);

    println!("\nPages:");
    for page in 1..=config.source.max_pages.min(MAX_PAGES) {
        println!("  {}. {}", page, site.listing_url(page));
    }
    println!("  Details: {}", site.detail_url("<id>"));

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nContent Store:");
    println!("  API: {}", store.resolved_api_base());
    println!("  Dataset: {}", store.dataset);
    println!("  API version: {}", store.api_version);
    println!("  Document type: {}", store.document_type);
    let token_state = match std::env::var(&store.token_env) {
        Ok(token) if !token.trim().is_empty() => "set",
        _ => "missing",
    };
    println!("  Token: ${} ({})", store.token_env, token_state);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the crawl operation
async fn handle_crawl(config: &Config, output: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {}/{} (up to {} pages)",
        config.source.origin,
        config.source.dealer_path,
        config.source.max_pages
    );

    let report = match run_crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            write_payload(&ErrorResponse::new(&e), output)?;
            return Err(e.into());
        }
    };

    if !quiet {
        print_crawl_summary(&CrawlSummary::from_report(&report));
    }

    write_payload(
        &CrawlResponse {
            bikes: report.listings,
        },
        output,
    )?;

    Ok(())
}

/// Handles the --import mode
async fn handle_import(
    config: &Config,
    import_path: &Path,
    only_selected: bool,
    output: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let body = std::fs::read_to_string(import_path)
        .with_context(|| format!("Failed to read import file {}", import_path.display()))?;

    let mut entries: Vec<ImportEntry> = match parse_import_request(&body) {
        Ok(entries) => entries,
        Err(e) => return fail_import(e.into(), output),
    };

    if only_selected {
        let total = entries.len();
        entries.retain(ImportEntry::is_selected);
        tracing::info!("{} of {} listings selected", entries.len(), total);
    }

    let results = match run_import(config, &entries).await {
        Ok(results) => results,
        Err(e) => return fail_import(e, output),
    };

    if !quiet {
        print_import_summary(&ImportSummary::from_results(&results), &results);
    }

    write_payload(&ImportResponse { results }, output)?;

    Ok(())
}

/// Writes the single top-level error body and fails the run
fn fail_import(error: HarvestError, output: Option<&Path>) -> anyhow::Result<()> {
    tracing::error!("Import failed: {}", error);
    let message = match &error {
        HarvestError::Import(e) => e.to_string(),
        other => other.to_string(),
    };
    write_payload(&ErrorResponse::new(message), output)?;
    Err(error.into())
}

// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing)
// 3. Crawl from the seed until no undiscovered feeds remain
// 4. Rank the feeds and write the result files
// 5. Exit with proper code (0 = success, 2 = error)
//
// Rust concepts used:
// - async/await: Because we fetch many feeds concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;      // src/cli.rs - command-line parsing
mod config;   // src/config.rs - crawl settings
mod crawl;    // src/crawl/ - frontier and orchestrator
mod error;    // src/error.rs - typed errors for the crawl core
mod fetch;    // src/fetch/ - http and gemini retrieval
mod output;   // src/output/ - result files
mod parser;   // src/parser/ - twtxt line grammar
mod registry; // src/registry/ - shared feed records and totals
mod stats;    // src/stats/ - z-score ranking

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, LogFormat};
use crawl::Crawler;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "crawl failed");
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.crawl_config();
    config.validate()?;

    let crawler = Crawler::new(&config).context("Failed to set up fetchers")?;
    let report = crawler.run().await?;

    let ranking = stats::rank(&report.snapshot);
    tracing::info!(
        mention_mean = ?ranking.mentions.mean,
        mention_std = ?ranking.mentions.std,
        activity_mean = ?ranking.activity.mean,
        activity_std = ?ranking.activity.std,
        "ranking computed"
    );

    let dir = cli.output_dir();
    let files = output::write_all(&dir, &report.snapshot, &ranking, cli.rank_format())?;
    tracing::info!(
        accessible = %files.accessible.display(),
        active = %files.active.display(),
        rank = %files.rank.display(),
        interactions = %files.interactions.display(),
        "results written"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
    }

    println!(
        "we went through {} links ({} feeds known), downloaded {} Mb in {:?}",
        report.visited,
        report.snapshot.feeds.len(),
        report.snapshot.total_bytes / 1024 / 1024,
        report.elapsed
    );

    Ok(())
}

// RUST_LOG wins when set; otherwise info, or debug with --verbose.
fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "twtxt_rank=debug,warn"
    } else {
        "twtxt_rank=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why log to stderr?
//    - stdout carries the --json ranking, so it can be piped into jq
//    - stderr carries progress and diagnostics
//
// 2. What is {:#} on an anyhow error?
//    - The alternate format prints the whole chain of .context() messages
//    - e.g. "Failed to create /x/rank.csv: Permission denied"
//
// 3. Why exit code 2?
//    - It matches the convention of a tool failing for internal reasons,
//      as opposed to 1 meaning "ran fine, found problems"
// -----------------------------------------------------------------------------

//! ragfuse: query every configured knowledge source at once and print one
//! fused ranking.

use std::path::PathBuf;

use clap::Parser;

use ragfuse_core::config::Config;
use ragfuse_core::SearchOptions;
use ragfuse_hybrid::present::{render_json, render_text};

mod wiring;

#[derive(Parser)]
#[command(name = "ragfuse")]
#[command(author, version, about = "Hybrid retrieval over local knowledge sources", long_about = None)]
struct Cli {
    /// Search query
    query: String,

    /// Maximum number of results (defaults to search.default_limit)
    #[arg(long)]
    limit: Option<usize>,

    /// Drop results below MED confidence
    #[arg(long)]
    strict: bool,

    /// Rerank the top candidates with the configured reranker
    #[arg(long)]
    rerank: bool,

    /// Show per-source signal breakdown
    #[arg(long)]
    debug: bool,

    /// Print the JSON payload instead of text
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to ./ragfuse.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = config.settings()?;

    let options = SearchOptions {
        limit: cli.limit.unwrap_or(settings.search.default_limit).max(1),
        strict: cli.strict,
        rerank: cli.rerank,
        debug: cli.debug,
    };

    let engine = wiring::build_engine(&settings).await?;
    let response = engine.search(&cli.query, options).await;

    if cli.json {
        println!("{}", render_json(&response, &options, engine.thresholds()));
    } else {
        print!("{}", render_text(&cli.query, &response, &options, engine.thresholds()));
    }
    Ok(())
}

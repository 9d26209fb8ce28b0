//! # Agri Harvester
//!
//! Harvests agriculture articles from a fixed set of news sites. An
//! LLM-backed oracle reads each site and proposes article links; the
//! harvester filters them, asks the oracle for each article's fields, keeps
//! the relevant ones and writes one JSON record per article.
//!
//! ## Usage
//!
//! ```sh
//! agri_harvester -o ./articles --relevance keywords --download-images
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: ask the oracle for article links on each site page
//! 2. **Filtering**: drop seen URLs and URLs that do not look like articles
//! 3. **Extraction**: ask the oracle for title, body, date and image
//! 4. **Relevance**: keyword match or the oracle's own judgement
//! 5. **Output**: one `<uuid>.json` per article, images under `images/`
//!
//! Everything runs sequentially with a fixed pause between articles.

use awful_aj::{config_dir, template};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod discovery;
mod error;
mod extract;
mod images;
mod models;
mod oracle;
mod pipeline;
mod relevance;
mod seen;
mod storage;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::HarvestConfig;
use oracle::LlmOracle;
use pipeline::Harvester;
use storage::ArticleStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("agri_harvester starting up");

    // HARVEST_* variables may come from a local .env file
    utils::load_env_file(Path::new(".env"));

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.config, "Parsed CLI arguments");

    // ---- Harvest configuration ----
    let mut harvest_config = match &args.config {
        Some(path) => {
            let loaded = HarvestConfig::from_yaml_file(path)?;
            info!(path = %path.display(), sites = loaded.sites.len(), "Loaded harvest config");
            loaded
        }
        None => HarvestConfig::default(),
    };
    args.apply(&mut harvest_config);
    harvest_config.validate()?;

    // Fail early if records cannot be written
    let store = match ArticleStore::open(&args.output_dir).await {
        Ok(store) => store,
        Err(e) => {
            error!(
                path = %args.output_dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    };

    // ---- Model backend ----
    let conf_file = match &args.llm_config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml"),
    };
    let config_path = conf_file
        .to_str()
        .ok_or("LLM config path is not valid UTF-8")?;
    let mut llm_config = awful_aj::config::load_config(config_path)?;
    if let Some(key) = &args.api_key {
        llm_config.api_key = key.clone();
    }
    info!(config_path, "Loaded model configuration");

    let template = template::load_template(&args.template).await?;
    info!(template = %args.template, "Loaded template");

    let oracle = LlmOracle::new(
        llm_config,
        template,
        Duration::from_secs(args.fetch_timeout_secs),
    )?;

    // ---- Harvest ----
    info!(
        sites = harvest_config.sites.len(),
        relevance = ?harvest_config.relevance,
        download_images = harvest_config.download_images,
        "Starting harvest"
    );
    let harvester = Harvester::new(oracle, &harvest_config, store).await?;
    let counters = harvester.run().await;

    info!(
        sites_visited = counters.sites_visited,
        sites_failed = counters.sites_failed,
        links_discovered = counters.links_discovered,
        links_already_seen = counters.links_already_seen,
        links_rejected_by_shape = counters.links_rejected_by_shape,
        extraction_attempts = counters.extraction_attempts,
        extraction_failures = counters.extraction_failures,
        articles_rejected = counters.articles_rejected,
        agriculture_articles = counters.agriculture_articles,
        images_downloaded = counters.images_downloaded,
        image_failures = counters.image_failures,
        storage_failures = counters.storage_failures,
        "Harvest summary"
    );

    if let Some(path) = &args.summary_file {
        let json = serde_json::to_string_pretty(&counters)?;
        if let Err(e) = tokio::fs::write(path, json).await {
            error!(path = %path.display(), error = %e, "Failed to write run summary");
        } else {
            info!(path = %path.display(), "Wrote run summary");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

//! Command-line interface definitions for the harvester.
//!
//! Every option can also come from an environment variable. Options given
//! here override the matching keys of the YAML harvest file.

use crate::config::{HarvestConfig, RelevanceMode};
use crate::extract::Envelope;
use clap::Parser;
use std::path::PathBuf;

/// Harvest agriculture articles from news sites into JSON records.
///
/// ```sh
/// # Built-in site list, keyword filter, records in ./articles
/// agri_harvester
///
/// # Custom sites, let the model judge relevance, keep images
/// agri_harvester -c harvest.yaml --relevance agent --download-images
///
/// # Remember handled URLs between runs
/// agri_harvester --seen-log ./state/seen.log
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory receiving one JSON file per article
    #[arg(short, long, env = "HARVEST_OUTPUT_DIR", default_value = "articles")]
    pub output_dir: PathBuf,

    /// YAML file with sites, keywords and link patterns
    #[arg(short, long, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// awful_aj config.yaml for the model backend (defaults to its config dir)
    #[arg(long, env = "HARVEST_LLM_CONFIG")]
    pub llm_config: Option<PathBuf>,

    /// awful_aj chat template name
    #[arg(long, env = "HARVEST_TEMPLATE", default_value = "agri_harvester")]
    pub template: String,

    /// API key for the model backend, overriding the one in the LLM config
    #[arg(long, env = "HARVEST_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// How article relevance is decided
    #[arg(long, value_enum, env = "HARVEST_RELEVANCE")]
    pub relevance: Option<RelevanceMode>,

    /// Which reply envelopes are accepted around JSON payloads
    #[arg(long, value_enum, env = "HARVEST_ENVELOPE")]
    pub envelope: Option<Envelope>,

    /// Pause after each article, in seconds
    #[arg(long, env = "HARVEST_DELAY_SECS")]
    pub delay_secs: Option<f64>,

    /// Download each article's primary image
    #[arg(long, env = "HARVEST_DOWNLOAD_IMAGES")]
    pub download_images: bool,

    /// Append-only file of URLs already handled, kept across runs
    #[arg(long, env = "HARVEST_SEEN_LOG")]
    pub seen_log: Option<PathBuf>,

    /// Write the run counters as JSON to this file
    #[arg(long, env = "HARVEST_SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,

    /// Timeout for page and image fetches, in seconds
    #[arg(long, env = "HARVEST_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(relevance) = self.relevance {
            config.relevance = relevance;
        }
        if let Some(envelope) = self.envelope {
            config.envelope = envelope;
        }
        if let Some(delay) = self.delay_secs {
            config.article_delay_secs = delay;
        }
        if self.download_images {
            config.download_images = true;
        }
        if let Some(seen_log) = &self.seen_log {
            config.seen_log = Some(seen_log.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["agri_harvester"]);
        assert_eq!(cli.output_dir, PathBuf::from("articles"));
        assert_eq!(cli.template, "agri_harvester");
        assert_eq!(cli.fetch_timeout_secs, 30);
        assert!(cli.relevance.is_none());
        assert!(!cli.download_images);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["agri_harvester", "-o", "/tmp/out", "-c", "/tmp/harvest.yaml"]);
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/harvest.yaml")));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "agri_harvester",
            "--relevance",
            "agent",
            "--envelope",
            "strict",
            "--delay-secs",
            "0.5",
            "--download-images",
            "--seen-log",
            "seen.log",
        ]);
        let mut config = HarvestConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.relevance, RelevanceMode::Agent);
        assert_eq!(config.envelope, Envelope::Strict);
        assert_eq!(config.article_delay_secs, 0.5);
        assert!(config.download_images);
        assert_eq!(config.seen_log, Some(PathBuf::from("seen.log")));
    }

    #[test]
    fn test_cli_infinite_delay_fails_validation() {
        let cli = Cli::parse_from(["agri_harvester", "--delay-secs", "inf"]);
        let mut config = HarvestConfig::default();
        cli.apply(&mut config);
        assert!(matches!(config.validate(), Err(ConfigError::Delay(_))));
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::parse_from(["agri_harvester"]);
        let mut config = HarvestConfig {
            download_images: true,
            ..Default::default()
        };
        cli.apply(&mut config);
        assert!(config.download_images);
        assert_eq!(config.relevance, RelevanceMode::Keywords);
    }
}

//! Immutable harvest configuration.
//!
//! The site list, keyword list and link-shape patterns are plain data handed
//! to the [`Harvester`](crate::pipeline::Harvester) at construction. Built-in
//! defaults cover the agriculture desks of a set of East African outlets; a
//! YAML file can replace any part of them.
//!
//! ```yaml
//! sites:
//!   - name: Farmers Review
//!     url: https://farmers.example/news
//!     alternate_urls: [https://farmers.example]
//! keywords: [maize, livestock]
//! relevance: keywords
//! article_delay_secs: 2
//! download_images: true
//! ```

use crate::error::ConfigError;
use crate::extract::Envelope;
use crate::models::SiteDescriptor;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Which relevance decision the harvester applies to extracted articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceMode {
    /// Case-insensitive keyword match on title and body.
    #[default]
    Keywords,
    /// Trust the oracle's own relevance judgement.
    Agent,
}

/// Everything a harvest run needs to know, fixed for the run's lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub sites: Vec<SiteDescriptor>,
    pub keywords: Vec<String>,
    /// Regexes over the URL path; a candidate must match at least one.
    pub link_patterns: Vec<String>,
    pub relevance: RelevanceMode,
    pub envelope: Envelope,
    pub article_delay_secs: f64,
    pub download_images: bool,
    /// Append-only log of seen URLs; `None` keeps the seen-set in memory.
    pub seen_log: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sites: default_sites(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            link_patterns: DEFAULT_LINK_PATTERNS.iter().map(|p| p.to_string()).collect(),
            relevance: RelevanceMode::default(),
            envelope: Envelope::default(),
            article_delay_secs: 2.0,
            download_images: false,
            seen_log: None,
        }
    }
}

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "agriculture",
    "agricultural",
    "agribusiness",
    "farm",
    "farmer",
    "farming",
    "crop",
    "harvest",
    "maize",
    "wheat",
    "rice",
    "coffee",
    "tea",
    "dairy",
    "livestock",
    "cattle",
    "poultry",
    "fertiliser",
    "fertilizer",
    "irrigation",
    "seed",
    "pest",
    "locust",
    "horticulture",
    "fisheries",
    "food security",
    "drought",
    "agronomy",
];

pub const DEFAULT_LINK_PATTERNS: &[&str] = &[
    r"/agri(culture|business)?/[^/]+[-_][^/]+",
    r"/farm(ing|ers)?/[^/]+[-_][^/]+",
    r"/(news|business|counties|africa|kenya)/[^/]+[-_][^/]+[-_][^/]+",
    r"/\d{4}/\d{2}/\d{2}/[^/]+",
    r"/article/[^/]+",
    r"-\d{5,}(\.html?)?/?$",
];

fn default_sites() -> Vec<SiteDescriptor> {
    vec![
        SiteDescriptor::new("Daily Nation", "https://nation.africa/kenya/business/seeds-of-gold")
            .with_alternates(&["https://nation.africa/kenya/business"]),
        SiteDescriptor::new("The Standard", "https://www.standardmedia.co.ke/farmkenya")
            .with_alternates(&["https://www.standardmedia.co.ke/business"]),
        SiteDescriptor::new("The Star", "https://www.the-star.co.ke/business/kenya/"),
        SiteDescriptor::new("Kenya News Agency", "https://www.kenyanews.go.ke/category/agriculture/"),
        SiteDescriptor::new("Farmers Review Africa", "https://farmersreviewafrica.com/category/news/"),
        SiteDescriptor::new("Capital FM Business", "https://www.capitalfm.co.ke/business/category/agriculture/"),
    ]
}

impl HarvestConfig {
    /// Load a YAML harvest file; omitted keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Pause between two articles.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Delay`] when `article_delay_secs` is negative, NaN,
    /// infinite or too large for a [`Duration`].
    pub fn article_delay(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.article_delay_secs)
            .map_err(|_| ConfigError::Delay(self.article_delay_secs))
    }

    /// Compile the link-shape patterns.
    pub fn link_matcher(&self) -> Result<RegexSet, ConfigError> {
        Ok(RegexSet::new(&self.link_patterns)?)
    }

    /// Reject configurations a run cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        for site in &self.sites {
            for url in site.urls() {
                if Url::parse(url).is_err() {
                    return Err(ConfigError::SiteUrl {
                        site: site.name.clone(),
                        url: url.to_string(),
                    });
                }
            }
        }
        self.article_delay()?;
        self.link_matcher()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarvestConfig::default();
        config.validate().unwrap();
        assert_eq!(config.relevance, RelevanceMode::Keywords);
        assert_eq!(config.envelope, Envelope::Lenient);
        assert_eq!(config.article_delay().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_default_patterns_accept_article_shapes() {
        let matcher = HarvestConfig::default().link_matcher().unwrap();
        assert!(matcher.is_match("/agriculture/x-1"));
        assert!(matcher.is_match("/kenya/business/seeds-of-gold/maize-farmers-count-losses-4821234"));
        assert!(matcher.is_match("/business/kenya/2025-05-06-tea-prices-fall"));
        assert!(!matcher.is_match("/agriculture/"));
        assert!(!matcher.is_match("/about-us"));
        assert!(!matcher.is_match("/"));
    }

    #[test]
    fn test_yaml_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "sites:\n  - name: Farm Desk\n    url: https://farm.example/news\nkeywords: [maize]\nrelevance: agent\nenvelope: strict\narticle_delay_secs: 0\n"
        )
        .unwrap();

        let config = HarvestConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.sites, vec![SiteDescriptor::new("Farm Desk", "https://farm.example/news")]);
        assert_eq!(config.keywords, vec!["maize".to_string()]);
        assert_eq!(config.relevance, RelevanceMode::Agent);
        assert_eq!(config.envelope, Envelope::Strict);
        assert_eq!(config.article_delay().unwrap(), Duration::ZERO);
        assert_eq!(config.link_patterns.len(), DEFAULT_LINK_PATTERNS.len());
        assert!(!config.download_images);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = HarvestConfig::from_yaml_file(Path::new("/nonexistent/harvest.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_inputs() {
        let mut config = HarvestConfig {
            sites: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoSites)));

        config.sites = vec![SiteDescriptor::new("Broken", "not a url")];
        assert!(matches!(config.validate(), Err(ConfigError::SiteUrl { .. })));

        config.sites = vec![SiteDescriptor::new("Ok", "https://ok.example")];
        config.link_patterns = vec!["(unclosed".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn test_validate_rejects_unusable_delays() {
        for secs in [f64::INFINITY, f64::NAN, -1.0, 1e20] {
            let config = HarvestConfig {
                article_delay_secs: secs,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Delay(_))),
                "delay {secs} should be rejected"
            );
        }

        let config = HarvestConfig {
            article_delay_secs: 0.25,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.article_delay().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_yaml_infinite_delay_is_rejected() {
        let config: HarvestConfig = serde_yaml::from_str("article_delay_secs: .inf\n").unwrap();
        assert!(config.article_delay_secs.is_infinite());
        assert!(matches!(config.validate(), Err(ConfigError::Delay(_))));
    }
}

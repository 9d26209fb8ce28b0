//! Data models for sites, candidate links and harvested article records.
//!
//! - [`SiteDescriptor`]: a news site the harvester visits
//! - [`CandidateLink`]: a URL the oracle proposed as a possible article
//! - [`ExtractedFields`]: the article fields as the oracle reported them
//! - [`ArticleRecord`]: the persisted unit of output
//! - [`HarvestCounters`]: per-run statistics

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category stamped on every persisted record.
pub const CATEGORY: &str = "Agriculture";

/// A news site to harvest.
///
/// Alternate URLs are only visited when the primary URL yields no usable
/// discovery response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_urls: Vec<String>,
}

impl SiteDescriptor {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            alternate_urls: Vec::new(),
        }
    }

    pub fn with_alternates(mut self, urls: &[&str]) -> Self {
        self.alternate_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    /// Primary URL followed by the alternates, in visiting order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.alternate_urls.iter().map(String::as_str))
    }
}

/// A link proposed by the discovery call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Article fields as returned by the extraction call.
///
/// The oracle is free text underneath, so a handful of field aliases are
/// accepted and everything except the title is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content", alias = "body")]
    pub description: String,
    #[serde(default, alias = "date", alias = "published_at")]
    pub posted_at: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_relevant: Option<bool>,
    #[serde(default)]
    pub relevance_reason: Option<String>,
}

/// A harvested article as written to disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub source_name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    /// Local path of the downloaded image, empty when none was stored.
    pub image_path: String,
    pub posted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
}

impl ArticleRecord {
    /// Build a fresh record with a new identifier and creation timestamps.
    pub fn new(fields: ExtractedFields, source_name: &str, source_url: &str) -> Self {
        let now = timestamp(Utc::now());
        Self {
            id: Uuid::new_v4(),
            title: fields.title.trim().to_string(),
            description: fields.description.trim().to_string(),
            category: CATEGORY.to_string(),
            source_name: source_name.to_string(),
            source_url: source_url.to_string(),
            image_url: fields.image_url.filter(|u| !u.trim().is_empty()),
            image_path: String::new(),
            posted_at: fields.posted_at.filter(|p| !p.trim().is_empty()),
            created_at: now.clone(),
            updated_at: now,
            relevance_reason: fields.relevance_reason,
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Statistics for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestCounters {
    pub sites_visited: usize,
    pub sites_failed: usize,
    pub links_discovered: usize,
    pub links_already_seen: usize,
    pub links_rejected_by_shape: usize,
    pub extraction_attempts: usize,
    pub extraction_failures: usize,
    pub articles_rejected: usize,
    pub agriculture_articles: usize,
    pub images_downloaded: usize,
    pub image_failures: usize,
    pub storage_failures: usize,
}

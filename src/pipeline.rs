//! The sequential harvest loop.
//!
//! ```text
//! for site in sites
//!     discover links (primary URL, then alternates until one answers)
//!     for link in filtered candidates
//!         extract fields -> judge relevance -> [download image] -> persist
//!         sleep(article_delay)
//! ```
//!
//! Everything is awaited in order on one task. The seen-set and counters
//! belong to the [`Harvester`] and are only touched through `&mut self`.
//! Failures are logged and counted; the only fatal error is opening the
//! output directory, which happens before the loop starts.

use crate::config::HarvestConfig;
use crate::discovery::{discover_links, filter_candidates, resolve_link};
use crate::error::{ExtractError, HarvestError, Result};
use crate::extract::{Envelope, Payload, extract_json};
use crate::images::download_image;
use crate::models::{ArticleRecord, CandidateLink, ExtractedFields, HarvestCounters, SiteDescriptor};
use crate::oracle::{Instruction, Oracle};
use crate::relevance::{RelevancePolicy, Verdict};
use crate::seen::SeenSet;
use crate::storage::ArticleStore;
use crate::utils::truncate_for_log;
use regex::RegexSet;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub struct Harvester<O> {
    oracle: O,
    sites: Vec<SiteDescriptor>,
    shapes: RegexSet,
    relevance: RelevancePolicy,
    envelope: Envelope,
    article_delay: Duration,
    download_images: bool,
    store: ArticleStore,
    seen: SeenSet,
    counters: HarvestCounters,
}

impl<O: Oracle> Harvester<O> {
    /// Validate `config`, then open the seen-set.
    ///
    /// # Arguments
    ///
    /// * `oracle` - Backend used for discovery, extraction and images
    /// * `config` - Harvest configuration, copied into the harvester
    /// * `store` - Already opened output directory
    ///
    /// # Errors
    ///
    /// [`HarvestError::Config`] for an invalid configuration and
    /// [`HarvestError::Storage`] when the seen log cannot be read.
    pub async fn new(oracle: O, config: &HarvestConfig, store: ArticleStore) -> Result<Self> {
        config.validate()?;
        let seen = match &config.seen_log {
            Some(path) => SeenSet::with_log(path)
                .await
                .map_err(|source| HarvestError::Storage {
                    path: path.display().to_string(),
                    source,
                })?,
            None => SeenSet::in_memory(),
        };
        info!(seen = seen.len(), persisted = config.seen_log.is_some(), "Seen-set ready");
        Ok(Self {
            oracle,
            sites: config.sites.clone(),
            shapes: config.link_matcher()?,
            relevance: RelevancePolicy::from_config(config),
            envelope: config.envelope,
            article_delay: config.article_delay()?,
            download_images: config.download_images,
            store,
            seen,
            counters: HarvestCounters::default(),
        })
    }

    /// Visit every configured site once and return the run's counters.
    ///
    /// Never fails: every per-site and per-article error is logged and
    /// counted.
    #[instrument(level = "info", skip_all, fields(sites = self.sites.len()))]
    pub async fn run(mut self) -> HarvestCounters {
        let t0 = Instant::now();
        let sites = std::mem::take(&mut self.sites);
        for site in &sites {
            self.harvest_site(site).await;
        }
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            persisted = self.counters.agriculture_articles,
            "Harvest finished"
        );
        self.counters
    }

    #[instrument(level = "info", skip_all, fields(site = %site.name))]
    async fn harvest_site(&mut self, site: &SiteDescriptor) {
        self.counters.sites_visited += 1;

        let mut found = None;
        for page_url in site.urls() {
            match discover_links(&self.oracle, &site.name, page_url, self.envelope).await {
                Ok(links) => {
                    found = Some((page_url, links));
                    break;
                }
                Err(e) => warn!(url = %page_url, error = %e, "Link discovery failed"),
            }
        }
        let Some((page_url, links)) = found else {
            self.counters.sites_failed += 1;
            error!("No usable discovery response for any site URL; moving on");
            return;
        };

        let candidates = filter_candidates(
            page_url,
            links,
            &self.shapes,
            &mut self.seen,
            &mut self.counters,
        )
        .await;

        for candidate in candidates {
            self.harvest_article(site, &candidate).await;
            if !self.article_delay.is_zero() {
                sleep(self.article_delay).await;
            }
        }
    }

    /// Extract, judge and persist one candidate.
    #[instrument(level = "info", skip_all, fields(url = %candidate.url))]
    async fn harvest_article(&mut self, site: &SiteDescriptor, candidate: &CandidateLink) {
        self.counters.extraction_attempts += 1;
        let instruction = Instruction::extract_article(self.relevance.asks_oracle());

        let reply = match self.oracle.fetch_and_instruct(&candidate.url, &instruction).await {
            Ok(reply) => reply,
            Err(e) => {
                self.counters.extraction_failures += 1;
                error!(error = %e, "Oracle call failed; skipping article");
                return;
            }
        };

        let mut fields: ExtractedFields = match extract_json(&reply, Payload::ArticleFields, self.envelope) {
            Ok(fields) => fields,
            Err(ExtractError::NotFound) => {
                self.counters.extraction_failures += 1;
                warn!(
                    response_preview = %truncate_for_log(&reply, 300),
                    "No JSON in extraction reply; skipping article"
                );
                return;
            }
            Err(e) => {
                self.counters.extraction_failures += 1;
                warn!(error = %e, "Model returned non-conforming JSON; skipping article");
                return;
            }
        };

        if fields.title.trim().is_empty() {
            self.counters.articles_rejected += 1;
            warn!("Extracted article has no title; skipping");
            return;
        }
        if let Verdict::Reject(reason) = self.relevance.judge(&fields) {
            self.counters.articles_rejected += 1;
            info!(title = %fields.title, %reason, "Article not relevant; skipping");
            return;
        }

        let base = Url::parse(&candidate.url).ok();
        fields.image_url = fields
            .image_url
            .and_then(|raw| resolve_link(base.as_ref(), &raw));

        let mut record = ArticleRecord::new(fields, &site.name, &candidate.url);
        if self.download_images {
            self.attach_image(&mut record).await;
        }

        match self.store.write(&record).await {
            Ok(path) => {
                self.counters.agriculture_articles += 1;
                info!(id = %record.id, title = %record.title, path = %path.display(), "Saved article");
            }
            Err(e) => {
                self.counters.storage_failures += 1;
                error!(id = %record.id, error = %e, "Failed to write article record");
            }
        }
    }

    async fn attach_image(&mut self, record: &mut ArticleRecord) {
        let Some(image_url) = record.image_url.clone() else {
            debug!("No image URL reported");
            return;
        };
        match download_image(&self.oracle, &image_url, &self.store.image_dir()).await {
            Ok(path) => {
                record.image_path = path.display().to_string();
                self.counters.images_downloaded += 1;
            }
            Err(e) => {
                self.counters.image_failures += 1;
                warn!(%image_url, error = %e, "Image download failed; keeping record without image");
            }
        }
    }
}

//! Link discovery: ask the oracle for article links on a site page and keep
//! the ones worth extracting.
//!
//! Candidates are checked in reply order. Each one is resolved against the
//! page URL, deduplicated within the reply, checked against the seen-set and
//! finally against the URL-shape patterns. Every candidate that reaches the
//! seen-set check is recorded as seen, including the ones the shape filter
//! rejects afterwards, so a rejected link is never retried.

use crate::error::{ExtractError, OracleError};
use crate::extract::{Envelope, Payload, extract_json};
use crate::models::{CandidateLink, HarvestCounters};
use crate::oracle::{Instruction, Oracle};
use crate::seen::SeenSet;
use itertools::Itertools;
use regex::RegexSet;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Why a discovery call produced no candidates at all.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Ask the oracle for candidate links on `page_url`.
///
/// # Arguments
///
/// * `oracle` - Backend that fetches the page and answers the instruction
/// * `site_name` - Human-readable outlet name, quoted in the instruction
/// * `page_url` - Landing page to enumerate
/// * `envelope` - Which JSON envelopes are accepted in the reply
///
/// # Returns
///
/// The links exactly as the oracle reported them, possibly relative and
/// possibly repeated; [`filter_candidates`] cleans them up.
///
/// # Errors
///
/// [`DiscoveryError::Oracle`] when the call itself fails and
/// [`DiscoveryError::Extract`] when the reply carries no usable link list.
#[instrument(level = "info", skip_all, fields(site = %site_name, url = %page_url))]
pub async fn discover_links<O: Oracle>(
    oracle: &O,
    site_name: &str,
    page_url: &str,
    envelope: Envelope,
) -> Result<Vec<CandidateLink>, DiscoveryError> {
    let reply = oracle
        .fetch_and_instruct(page_url, &Instruction::discover_links(site_name))
        .await?;
    let links: Vec<CandidateLink> = extract_json(&reply, Payload::LinkList, envelope)?;
    info!(count = links.len(), "Oracle proposed links");
    Ok(links)
}

/// Filter discovered candidates, updating `seen` and `counters`.
///
/// # Arguments
///
/// * `page_url` - Page the candidates were found on, used to resolve relative links
/// * `candidates` - Links in reply order
/// * `shapes` - Compiled URL-path patterns; a link must match one
/// * `seen` - Seen-set, extended with every link that reaches the shape check
/// * `counters` - Run counters to update
///
/// # Returns
///
/// The candidates that should go to the extraction step, with absolute,
/// fragment-free URLs.
///
/// # Examples
///
/// ```ignore
/// let accepted = filter_candidates(
///     "https://site/news/",
///     vec![CandidateLink { url: "/agriculture/maize-prices-1".into(), title: String::new() }],
///     &config.link_matcher()?,
///     &mut seen,
///     &mut counters,
/// ).await;
/// assert_eq!(accepted[0].url, "https://site/agriculture/maize-prices-1");
/// ```
pub async fn filter_candidates(
    page_url: &str,
    candidates: Vec<CandidateLink>,
    shapes: &RegexSet,
    seen: &mut SeenSet,
    counters: &mut HarvestCounters,
) -> Vec<CandidateLink> {
    let base = Url::parse(page_url).ok();
    let mut accepted = Vec::new();

    let resolved = candidates
        .into_iter()
        .filter_map(|c| {
            let url = resolve_link(base.as_ref(), &c.url)?;
            Some(CandidateLink { url, title: c.title })
        })
        .unique_by(|c| c.url.clone());

    for candidate in resolved {
        counters.links_discovered += 1;

        if seen.contains(&candidate.url) {
            counters.links_already_seen += 1;
            debug!(url = %candidate.url, "Already seen; skipping");
            continue;
        }
        if let Err(e) = seen.insert(&candidate.url).await {
            warn!(url = %candidate.url, error = %e, "Failed to append to seen log");
        }

        if !matches_shape(shapes, &candidate.url) {
            counters.links_rejected_by_shape += 1;
            debug!(url = %candidate.url, "Does not look like an article; skipping");
            continue;
        }
        accepted.push(candidate);
    }

    info!(accepted = accepted.len(), "Filtered candidate links");
    accepted
}

/// Make `raw` absolute against `base`, dropping any fragment.
///
/// Returns `None` for empty input, unparseable URLs and schemes other than
/// http(s).
pub fn resolve_link(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok()?,
        Err(_) => return None,
    };
    url.set_fragment(None);
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn matches_shape(shapes: &RegexSet, url: &str) -> bool {
    Url::parse(url)
        .map(|u| shapes.is_match(u.path()))
        .unwrap_or(false)
}

//! Decide whether an extracted article is about agriculture.
//!
//! Two mutually exclusive policies exist: a keyword filter applied locally,
//! and the oracle's own judgement returned alongside the article fields. The
//! policy is fixed when the harvester is built.

use crate::config::{HarvestConfig, RelevanceMode};
use crate::models::ExtractedFields;

/// Outcome of a relevance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(String),
}

#[derive(Debug, Clone)]
pub enum RelevancePolicy {
    /// Accept when any keyword occurs in the title or body (case-insensitive).
    Keywords(Vec<String>),
    /// Accept when the oracle reported `is_relevant: true`.
    AgentJudged,
}

impl RelevancePolicy {
    pub fn from_config(config: &HarvestConfig) -> Self {
        match config.relevance {
            RelevanceMode::Keywords => Self::keywords(&config.keywords),
            RelevanceMode::Agent => Self::AgentJudged,
        }
    }

    pub fn keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::Keywords(
            keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    /// Whether the extraction instruction must ask the oracle for a judgement.
    pub fn asks_oracle(&self) -> bool {
        matches!(self, Self::AgentJudged)
    }

    pub fn judge(&self, fields: &ExtractedFields) -> Verdict {
        match self {
            Self::Keywords(keywords) => {
                let haystack = format!("{}\n{}", fields.title, fields.description).to_lowercase();
                match keywords.iter().find(|k| haystack.contains(k.as_str())) {
                    Some(_) => Verdict::Accept,
                    None => Verdict::Reject("no agriculture keyword in title or body".to_string()),
                }
            }
            Self::AgentJudged => match fields.is_relevant {
                Some(true) => Verdict::Accept,
                Some(false) => Verdict::Reject(
                    fields
                        .relevance_reason
                        .clone()
                        .unwrap_or_else(|| "judged not relevant".to_string()),
                ),
                None => Verdict::Reject("no relevance judgement in reply".to_string()),
            },
        }
    }
}

//! Recover JSON values embedded in free-text oracle replies.
//!
//! Replies are prose that may contain a fenced code block labelled `json`.
//! The fenced block always wins. Under the [`Envelope::Lenient`] policy a
//! reply without a fence is scanned for the first recognisable opening token
//! of the expected payload (`[{"url"` for link lists, `{"title"` for article
//! fields) and one JSON value is parsed from there; whatever prose follows
//! that value is ignored.

use crate::error::ExtractError;
use crate::utils::{looks_truncated, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+-]*)[^\n]*\n(.*?)```").expect("static regex")
});

static LINK_LIST_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[\s*\{\s*"url""#).expect("static regex"));

static ARTICLE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\s*"title""#).expect("static regex"));

/// How much of a reply is shown in error previews.
const PREVIEW_LEN: usize = 300;

/// Which envelopes are accepted around a JSON payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// Only a fenced `json` block is accepted.
    Strict,
    /// Fenced block first, then the first recognisable opening token.
    #[default]
    Lenient,
}

/// Shape of the payload expected in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// A JSON array of `{"url", "title"}` objects.
    LinkList,
    /// A JSON object describing one article.
    ArticleFields,
}

impl Payload {
    fn opening_token(self) -> &'static Regex {
        match self {
            Payload::LinkList => &*LINK_LIST_TOKEN,
            Payload::ArticleFields => &*ARTICLE_TOKEN,
        }
    }
}

/// Return the contents of the first fenced block carrying `label`.
///
/// Labels compare case-insensitively; the contents are trimmed.
pub fn extract_fenced_block<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    fenced_blocks(text, label).next()
}

fn fenced_blocks<'a, 'b>(text: &'a str, label: &'b str) -> impl Iterator<Item = &'a str> {
    FENCED_BLOCK.captures_iter(text).filter_map(move |caps| {
        let tag = caps.get(1).map_or("", |m| m.as_str());
        if tag.eq_ignore_ascii_case(label) {
            caps.get(2).map(|m| m.as_str().trim())
        } else {
            None
        }
    })
}

/// Locate and parse the JSON payload of `text`.
///
/// Returns [`ExtractError::NotFound`] when the reply has neither a fenced
/// `json` block nor (in lenient mode) an opening token, and
/// [`ExtractError::Malformed`] when a candidate was found but did not parse.
pub fn extract_json<T: DeserializeOwned>(
    text: &str,
    payload: Payload,
    envelope: Envelope,
) -> Result<T, ExtractError> {
    let mut first_error = None;
    for block in fenced_blocks(text, "json") {
        match serde_json::from_str::<T>(block) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(error = %e, truncated = looks_truncated(&e), "Fenced JSON block did not parse");
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(source) = first_error {
        return Err(malformed(source, text));
    }

    if envelope == Envelope::Strict {
        return Err(ExtractError::NotFound);
    }

    let start = payload
        .opening_token()
        .find(text)
        .ok_or(ExtractError::NotFound)?
        .start();

    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<T>();
    match stream.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => {
            debug!(error = %e, truncated = looks_truncated(&e), "Unfenced JSON did not parse");
            Err(malformed(e, text))
        }
        None => Err(ExtractError::NotFound),
    }
}

fn malformed(source: serde_json::Error, text: &str) -> ExtractError {
    ExtractError::Malformed {
        source,
        preview: truncate_for_log(text, PREVIEW_LEN),
    }
}

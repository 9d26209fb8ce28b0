//! The content-fetching oracle and its LLM-backed implementation.
//!
//! The harvester never sees structured data from the outside world: it hands
//! an [`Instruction`] and a URL to an [`Oracle`] and gets free text back. The
//! text may embed a fenced JSON payload (links or article fields) or a fenced
//! base64 payload (image bytes); recovering those is the caller's job.
//!
//! [`LlmOracle`] is the production backend. It downloads the page itself,
//! flattens it to text plus a link listing, and asks an OpenAI-compatible
//! model (through `awful_aj`) to carry out the instruction against that text.

use crate::error::OracleError;
use crate::utils::cut_at_char_boundary;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// What the oracle is asked to do with a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    DiscoverLinks,
    ExtractArticle,
    DownloadImage,
}

/// A natural-language instruction for the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub prompt: String,
}

impl Instruction {
    /// Ask for agriculture article links on a site's landing page.
    pub fn discover_links(site_name: &str) -> Self {
        let prompt = format!(
            "You are looking at a page of the news site \"{site_name}\". \
             List every link on this page that points to an individual news article about \
             agriculture, farming, livestock, crops, fisheries or food production. \
             Skip navigation, category, tag, author and advertisement links. \
             Reply with a single fenced ```json block containing an array of objects \
             with the keys \"url\" and \"title\", for example:\n\
             ```json\n[{{\"url\": \"https://example.com/agriculture/maize-prices-rise-123\", \
             \"title\": \"Maize prices rise\"}}]\n```\n\
             Reply with an empty array if there are none."
        );
        Self {
            kind: InstructionKind::DiscoverLinks,
            prompt,
        }
    }

    /// Ask for the fields of one article.
    ///
    /// With `judge_relevance` the oracle also decides whether the article is
    /// about agriculture and explains why.
    pub fn extract_article(judge_relevance: bool) -> Self {
        let mut prompt = String::from(
            "Extract the news article on this page. Reply with a single fenced ```json block \
             containing an object with the keys \"title\" (the headline), \"description\" \
             (the full article body as plain text), \"posted_at\" (the publication date as \
             written on the page, or null) and \"image_url\" (the absolute URL of the main \
             article image, or null).",
        );
        if judge_relevance {
            prompt.push_str(
                " Also include \"is_relevant\" (true only if the article is about agriculture, \
                 farming, livestock, crops, fisheries or food production) and \
                 \"relevance_reason\" (one sentence explaining the decision).",
            );
        }
        prompt.push_str(" Do not summarise or translate the text.");
        Self {
            kind: InstructionKind::ExtractArticle,
            prompt,
        }
    }

    /// Ask for the bytes of an image as a fenced base64 block.
    pub fn download_image() -> Self {
        Self {
            kind: InstructionKind::DownloadImage,
            prompt: "Download the image at this URL and reply with its bytes encoded as \
                     base64 inside a single fenced ```base64 block."
                .to_string(),
        }
    }
}

/// Capability interface: fetch a URL and carry out an instruction on it.
pub trait Oracle {
    /// Returns the oracle's free-text reply.
    async fn fetch_and_instruct(
        &self,
        url: &str,
        instruction: &Instruction,
    ) -> Result<String, OracleError>;
}

/// Oracle backed by an HTTP client and an OpenAI-compatible model.
pub struct LlmOracle {
    client: Client,
    config: AwfulJadeConfig,
    template: ChatTemplate,
    max_page_bytes: usize,
}

impl fmt::Debug for LlmOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmOracle")
            .field("max_page_bytes", &self.max_page_bytes)
            .finish()
    }
}

impl LlmOracle {
    /// Page text sent to the model is cut to this many bytes.
    pub const DEFAULT_MAX_PAGE_BYTES: usize = 24_000;

    pub fn new(
        config: AwfulJadeConfig,
        template: ChatTemplate,
        fetch_timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .user_agent(concat!("agri_harvester/", env!("CARGO_PKG_VERSION")))
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| OracleError::Backend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            template,
            max_page_bytes: Self::DEFAULT_MAX_PAGE_BYTES,
        })
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, OracleError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| OracleError::Http {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(OracleError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_page_text(&self, url: &str) -> Result<String, OracleError> {
        let html = self
            .fetch(url)
            .await?
            .text()
            .await
            .map_err(|source| OracleError::Http {
                url: url.to_string(),
                source,
            })?;
        let base = Url::parse(url).map_err(|e| OracleError::Backend(format!("bad URL {url}: {e}")))?;
        let text = page_to_text(&html, &base);
        debug!(html_bytes = html.len(), text_bytes = text.len(), "Flattened page");
        Ok(cut_at_char_boundary(&text, self.max_page_bytes).to_string())
    }

    async fn fetch_image_block(&self, url: &str) -> Result<String, OracleError> {
        let bytes = self
            .fetch(url)
            .await?
            .bytes()
            .await
            .map_err(|source| OracleError::Http {
                url: url.to_string(),
                source,
            })?;
        info!(bytes = bytes.len(), "Fetched image");
        Ok(format!("```base64\n{}\n```", STANDARD.encode(&bytes)))
    }
}

impl Oracle for LlmOracle {
    #[instrument(level = "info", skip_all, fields(%url, kind = ?instruction.kind))]
    async fn fetch_and_instruct(
        &self,
        url: &str,
        instruction: &Instruction,
    ) -> Result<String, OracleError> {
        if instruction.kind == InstructionKind::DownloadImage {
            return self.fetch_image_block(url).await;
        }

        let page = self.fetch_page_text(url).await?;
        let question = format!(
            "{}\n\nPage URL: {url}\n\n--- PAGE CONTENT ---\n{page}\n--- END PAGE CONTENT ---",
            instruction.prompt
        );

        let t0 = Instant::now();
        let res = ask(&self.config, question, &self.template, None, None).await;
        let dt = t0.elapsed();
        match res {
            Ok(reply) => {
                info!(elapsed_ms = dt.as_millis() as u64, reply_bytes = reply.len(), "Model replied");
                Ok(reply)
            }
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed");
                Err(OracleError::Backend(e.to_string()))
            }
        }
    }
}

/// Flatten an HTML page into readable text followed by its absolute links.
pub fn page_to_text(html: &str, base: &Url) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    if let Ok(title_sel) = Selector::parse("title") {
        if let Some(title) = document.select(&title_sel).next() {
            out.push_str("Title: ");
            out.push_str(&collapse_ws(&element_text(&title)));
            out.push_str("\n\n");
        }
    }

    let main = Selector::parse("main, article").ok();
    let body = Selector::parse("body").ok();
    let mut blocks: Vec<String> = main
        .iter()
        .flat_map(|sel| document.select(sel))
        .map(|el| collapse_ws(&element_text(&el)))
        .filter(|t| !t.is_empty())
        .collect();
    if blocks.is_empty() {
        blocks = body
            .iter()
            .flat_map(|sel| document.select(sel))
            .map(|el| collapse_ws(&element_text(&el)))
            .collect();
    }
    out.push_str(&blocks.join("\n\n"));

    if let Ok(link_sel) = Selector::parse("a[href]") {
        let mut links = Vec::new();
        for a in document.select(&link_sel) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            links.push(format!("- [{}]({})", collapse_ws(&element_text(&a)), resolved));
        }
        if !links.is_empty() {
            out.push_str("\n\nLinks:\n");
            out.push_str(&links.join("\n"));
        }
    }

    out
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

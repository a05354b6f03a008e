//! Page-content fetching — URL to plain text.
//!
//! Absence of text is a normal, handled outcome: the pipeline skips the
//! program and leaves any prior record untouched.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ScrapeError;

/// External content-extraction collaborator: `fetch(url) -> text | empty`.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Retrieve the main text content of a page. An empty string means the
    /// page yielded no usable text.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Reqwest-backed fetcher with a minimal HTML-to-text reduction.
pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpContentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ScrapeError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let body = resp.text().await.map_err(|e| ScrapeError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(html_to_text(&body))
    }
}

static SCRIPT_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap());
static BLOCK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article)\b[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip markup down to readable text: scripts and styles removed, block
/// tags become newlines, remaining tags dropped, common entities decoded.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    // Collapse per-line whitespace while keeping line structure for the
    // section-boundary patterns downstream.
    let collapsed: String = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINES.replace_all(collapsed.trim(), "\n\n").to_string()
}

//! Readable-text scraper built on `reqwest` and `scraper`.
//!
//! Event pages are mostly navigation, cookie banners and footers around a
//! listing. Extraction keeps the text of `<article>`/`<main>` when present
//! and falls back to `<body>`, skipping elements that never hold listings.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use super::ScraperClient;
use crate::error::{ProviderError, check_status};
use crate::models::ScrapedPage;

const PROVIDER: &str = "scraper";

/// Sent with every page request.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; GigCrawler/2.0; +https://athensears.gr)";

/// Elements whose text is never part of an event listing.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "aside",
    "form", "iframe", "head",
];

static CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, main, [role=main]").expect("static selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static selector"));
static INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("static regex"));

/// Scraper that downloads pages over HTTP and extracts readable text.
#[derive(Debug, Clone)]
pub struct HttpScraper {
    http: Client,
}

impl HttpScraper {
    /// Wrap an HTTP client. The client should already carry the per-call
    /// timeout and [`USER_AGENT`].
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    async fn download(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        check_status(PROVIDER, response)
            .await?
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))
    }
}

#[async_trait]
impl ScraperClient for HttpScraper {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> ScrapedPage {
        let t0 = Instant::now();
        match self.download(url).await {
            Ok(html) => {
                let text = extract_readable_text(&html);
                match &text {
                    Some(t) => info!(
                        chars = t.chars().count(),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Extracted page text"
                    ),
                    None => warn!("No readable text extracted; keeping raw HTML"),
                }
                ScrapedPage::fetched(url, text, html)
            }
            Err(e) => {
                error!(error = %e, "Fetch failed");
                ScrapedPage::failed(url, e.to_string())
            }
        }
    }
}

/// Extract the readable text of an HTML document.
///
/// # Returns
///
/// `None` when nothing but whitespace remains after stripping markup.
pub fn extract_readable_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let mut chunks = Vec::new();
    for root in document.select(&CONTENT_SELECTOR) {
        // Nested matches (<main><article>) would be collected twice.
        if root.ancestors().any(|a| {
            ElementRef::wrap(a).is_some_and(|e| CONTENT_SELECTOR.matches(&e))
        }) {
            continue;
        }
        collect_text(root, &mut chunks);
    }
    if chunks.is_empty() {
        if let Some(body) = document.select(&BODY_SELECTOR).next() {
            collect_text(body, &mut chunks);
        } else {
            collect_text(document.root_element(), &mut chunks);
        }
    }

    let text = chunks.join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let line = INLINE_WS.replace_all(text.trim(), " ");
                if !line.is_empty() {
                    out.push(line.into_owned());
                }
            }
            Node::Element(el) => {
                if SKIPPED_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

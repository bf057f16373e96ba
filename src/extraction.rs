//! Structured extraction with a reasoning engine.
//!
//! # Architecture
//!
//! - [`ReasoningEngine`]: prompt in, raw text out. Implemented by
//!   [`GeminiEngine`](crate::gemini::GeminiEngine).
//! - [`ExtractionClient`]: the two capabilities the pipeline needs (URL
//!   filtering and gig extraction).
//! - [`GigExtractor`]: implements [`ExtractionClient`] over any engine. It
//!   owns the prompts, the retry policy, and all parsing.
//!
//! # Error Handling
//!
//! Engine transport failures (after retries) propagate. An answer that is not
//! the requested JSON never does: it is logged and becomes an empty result,
//! exactly like a page with no events.

use async_trait::async_trait;
use itertools::Itertools;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::ProviderError;
use crate::models::{
    ExtractedGig, Gig, GigExtractionResponse, ScrapedPage, SearchResult, UrlFilterResponse,
};
use crate::prompts;
use crate::retry::RetryPolicy;
use crate::utils::{looks_truncated, parse_date, truncate_chars, truncate_for_log};

/// Page text beyond this many characters is not sent to the engine.
pub const MAX_PAGE_CHARS: usize = 50_000;

/// Venue recorded when the engine names none.
pub const UNKNOWN_VENUE: &str = "Unknown Venue";

/// A large language model that answers a prompt with text.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// URL filtering and gig extraction.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// URLs among `results` likely to list upcoming events. Unparsable
    /// engine output yields an empty list, not an error.
    async fn filter_urls(&self, results: &[SearchResult]) -> Result<Vec<String>, ProviderError>;

    /// Gigs found on `page`. Pages without extractable text yield an empty
    /// list without calling the engine.
    async fn extract_gigs(&self, page: &ScrapedPage) -> Result<Vec<Gig>, ProviderError>;
}

/// [`ExtractionClient`] over any [`ReasoningEngine`].
#[derive(Debug)]
pub struct GigExtractor<E> {
    engine: E,
    retry: RetryPolicy,
}

impl<E> GigExtractor<E>
where
    E: ReasoningEngine,
{
    pub fn new(engine: E, retry: RetryPolicy) -> Self {
        Self { engine, retry }
    }

    /// Ask the engine with retries. A parse error from the engine itself
    /// (e.g. no candidates) is reported as `Ok(None)`.
    async fn ask(&self, operation: &str, prompt: &str) -> Result<Option<String>, ProviderError> {
        match self.retry.run(operation, || self.engine.ask(prompt)).await {
            Ok(text) => Ok(Some(text)),
            Err(ProviderError::Parse { message, .. }) => {
                warn!(operation, %message, "Engine returned no usable answer");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<E> ExtractionClient for GigExtractor<E>
where
    E: ReasoningEngine,
{
    #[instrument(level = "info", skip_all, fields(results = results.len()))]
    async fn filter_urls(&self, results: &[SearchResult]) -> Result<Vec<String>, ProviderError> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        let t0 = Instant::now();
        let prompt = prompts::url_filter(results);

        let Some(answer) = self.ask("engine.filter_urls", &prompt).await? else {
            return Ok(Vec::new());
        };
        let urls = parse_url_filter(&answer);

        info!(
            count = urls.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Filtered to promising URLs"
        );
        Ok(urls)
    }

    #[instrument(level = "info", skip_all, fields(url = %page.url))]
    async fn extract_gigs(&self, page: &ScrapedPage) -> Result<Vec<Gig>, ProviderError> {
        let Some(text) = page.extractable_text() else {
            warn!(success = page.success, "Skipping extraction (no text)");
            return Ok(Vec::new());
        };
        let t0 = Instant::now();
        let content = truncate_chars(text, MAX_PAGE_CHARS);
        if content.len() < text.len() {
            debug!(max_chars = MAX_PAGE_CHARS, "Truncated page text for engine");
        }
        let prompt = prompts::gig_extraction(&page.url, content);

        let Some(answer) = self.ask("engine.extract_gigs", &prompt).await? else {
            return Ok(Vec::new());
        };
        let gigs = parse_gig_extraction(&answer, &page.url);

        info!(
            count = gigs.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Extracted gigs from page"
        );
        Ok(gigs)
    }
}

/// Drop a surrounding Markdown code fence, if the engine added one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Option<T> {
    match serde_json::from_str::<T>(strip_code_fence(raw)) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                what,
                error = %e,
                truncated = looks_truncated(&e),
                response_preview = %truncate_for_log(raw, 300),
                "Engine returned non-conforming JSON"
            );
            None
        }
    }
}

/// Parse a URL-filter answer into absolute http(s) URLs, deduplicated in
/// first-seen order.
pub fn parse_url_filter(raw: &str) -> Vec<String> {
    let Some(parsed) = decode::<UrlFilterResponse>(raw, "url_filter") else {
        return Vec::new();
    };
    parsed
        .promising_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| match Url::parse(u) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => true,
            _ => {
                warn!(url = %u, "Dropping invalid URL from filter answer");
                false
            }
        })
        .unique()
        .collect()
}

/// Parse a gig-extraction answer. Each candidate is parsed on its own; a bad
/// one is dropped with a warning.
pub fn parse_gig_extraction(raw: &str, source_url: &str) -> Vec<Gig> {
    let Some(parsed) = decode::<GigExtractionResponse>(raw, "gig_extraction") else {
        return Vec::new();
    };
    parsed
        .gigs
        .into_iter()
        .filter_map(|candidate| parse_candidate(candidate, source_url))
        .collect()
}

fn parse_candidate(candidate: serde_json::Value, source_url: &str) -> Option<Gig> {
    let raw: ExtractedGig = match serde_json::from_value(candidate.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, gig = %candidate, "Skipping malformed gig");
            return None;
        }
    };

    let Some(title) = non_blank(raw.title) else {
        warn!(gig = %candidate, "Skipping gig without title");
        return None;
    };
    let Some(date) = raw.date.as_deref().and_then(parse_date) else {
        warn!(gig = %candidate, "Skipping gig with invalid date");
        return None;
    };

    Some(Gig {
        title,
        date,
        venue_name: non_blank(raw.venue_name).unwrap_or_else(|| UNKNOWN_VENUE.to_string()),
        description: non_blank(raw.description),
        price: non_blank(raw.price),
        source_url: Some(source_url.to_string()),
        image_url: non_blank(raw.image_url),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

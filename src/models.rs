//! Data models passed between the pipeline stages.
//!
//! - [`SearchResult`]: one ranked hit from the search provider (Pass 1)
//! - [`ScrapedPage`]: the outcome of fetching one URL (Pass 2)
//! - [`Gig`] and [`Venue`]: the structured records persisted to the CMS
//! - [`SyncStats`]: counters for one pipeline run
//!
//! The `Extracted*` and `*Response` structs mirror the JSON the reasoning
//! engine is asked to produce. Their fields are all optional so a single bad
//! record can be dropped without rejecting the whole answer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Integer id assigned by the CMS.
pub type EntityId = i64;

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
}

/// The result of fetching one URL.
///
/// `success == false` always comes with `text == None` and an `error`.
/// `success == true` with `text == None` means the page loaded but held
/// nothing readable; it is not an error, there is simply nothing to extract.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub url: String,
    pub text: Option<String>,
    pub raw_html: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl ScrapedPage {
    pub fn fetched(url: impl Into<String>, text: Option<String>, raw_html: String) -> Self {
        Self {
            url: url.into(),
            text,
            raw_html: Some(raw_html),
            success: true,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: None,
            raw_html: None,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Page text worth sending to the reasoning engine, if any.
    pub fn extractable_text(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A live-music event.
///
/// Two gigs are the same event when their `title` matches exactly and their
/// `date` falls on the same calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gig {
    pub title: String,
    pub date: NaiveDateTime,
    pub venue_name: String,
    pub description: Option<String>,
    pub price: Option<String>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
}

/// A venue, identified by its exact name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub address: Option<String>,
    pub website: Option<String>,
}

impl Venue {
    /// A venue with nothing but a name, as created on first sighting.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            website: None,
        }
    }
}

/// Counters for a single pipeline run. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub search_results: usize,
    pub filtered_urls: usize,
    pub scraped_urls: usize,
    pub gigs_extracted: usize,
    pub gigs_created: usize,
    pub gigs_skipped: usize,
    pub errors: usize,
}

/// Engine answer for URL filtering.
#[derive(Debug, Default, Deserialize)]
pub struct UrlFilterResponse {
    #[serde(default)]
    pub promising_urls: Vec<String>,
}

/// Engine answer for gig extraction.
///
/// Candidates stay as raw JSON until each one is parsed on its own.
#[derive(Debug, Default, Deserialize)]
pub struct GigExtractionResponse {
    #[serde(default)]
    pub gigs: Vec<serde_json::Value>,
}

/// One gig candidate as written by the engine.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractedGig {
    pub title: Option<String>,
    pub date: Option<String>,
    pub venue_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

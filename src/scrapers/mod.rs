//! Page scraping (Pass 2, step 1).
//!
//! A scraper turns a URL into a [`ScrapedPage`]. Unlike the other providers
//! it never returns an error: a failed fetch is reported in the page itself
//! (`success == false`) so one bad URL cannot poison the batch.
//!
//! # Implementations
//!
//! | Scraper | Module | Method |
//! |---------|--------|--------|
//! | [`HttpScraper`] | [`readable`] | `reqwest` fetch + readable-text extraction with `scraper` |
//!
//! `fetch_many` runs every fetch at once with no concurrency cap and waits
//! for all of them; the order of the returned pages is not meaningful.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::info;

use crate::models::ScrapedPage;

pub mod readable;

pub use readable::HttpScraper;

/// Fetches pages and extracts their readable text.
#[async_trait]
pub trait ScraperClient: Send + Sync {
    /// Fetch one URL. Failures are captured in the returned page.
    async fn fetch(&self, url: &str) -> ScrapedPage;

    /// Fetch every URL concurrently; one page per input URL.
    async fn fetch_many(&self, urls: &[String]) -> Vec<ScrapedPage> {
        let pages = join_all(urls.iter().map(|url| self.fetch(url))).await;
        let successful = pages.iter().filter(|p| p.success).count();
        info!(successful, total = urls.len(), "Finished scraping batch");
        pages
    }
}

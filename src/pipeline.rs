//! The two-pass sync pipeline.
//!
//! ```text
//! Pass 1 (discovery)   search ──► filter URLs
//! Pass 2 (extraction)  scrape (concurrent) ──► extract gigs ──► persist
//! ```
//!
//! Only the two discovery stages can abort a run. Everything after them is
//! handled per item: a failed scrape, extraction or write bumps
//! [`SyncStats::errors`] and the run carries on.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::{ProviderError, SyncError};
use crate::extraction::ExtractionClient;
use crate::models::{Gig, SyncStats};
use crate::scrapers::ScraperClient;
use crate::search::SearchClient;
use crate::store::GigStore;
use crate::utils::date_range_query;

/// How far ahead the search query looks.
pub const SEARCH_DAYS_AHEAD: i64 = 30;

const BASE_QUERY: &str = "live music events concerts gigs Athens Greece";

/// The external capabilities a run depends on.
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn SearchClient>,
    pub scraper: Arc<dyn ScraperClient>,
    pub extractor: Arc<dyn ExtractionClient>,
    pub store: Arc<dyn GigStore>,
}

/// Runs the pipeline end to end against a set of [`Providers`].
pub struct SyncPipeline {
    providers: Providers,
    max_results: usize,
    timezone: Tz,
}

/// What happened to one extracted gig.
enum Persisted {
    Created,
    Skipped,
}

impl SyncPipeline {
    pub fn new(providers: Providers, max_results: usize, timezone: Tz) -> Self {
        Self {
            providers,
            max_results,
            timezone,
        }
    }

    /// Run once, dating the search query from today in the configured zone.
    pub async fn run(&self) -> Result<SyncStats, SyncError> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        self.run_for(today).await
    }

    /// Run once with the search query built for `today`.
    #[instrument(level = "info", skip(self))]
    pub async fn run_for(&self, today: NaiveDate) -> Result<SyncStats, SyncError> {
        let t0 = Instant::now();
        let mut stats = SyncStats::default();

        // ---- Pass 1: discovery ----
        let query = search_query(today);
        info!(%query, "Starting gig sync");

        let results = self
            .providers
            .search
            .search(&query, self.max_results)
            .await
            .map_err(SyncError::Search)?;
        stats.search_results = results.len();
        if results.is_empty() {
            warn!("Search returned nothing; ending run");
            return Ok(stats);
        }

        let urls = self
            .providers
            .extractor
            .filter_urls(&results)
            .await
            .map_err(SyncError::Filter)?;
        stats.filtered_urls = urls.len();
        if urls.is_empty() {
            warn!("No promising URLs; ending run");
            return Ok(stats);
        }

        // ---- Pass 2: extraction ----
        let pages = self.providers.scraper.fetch_many(&urls).await;

        let mut gigs = Vec::new();
        for page in &pages {
            if !page.success {
                stats.errors += 1;
                continue;
            }
            stats.scraped_urls += 1;
            if page.extractable_text().is_none() {
                continue;
            }
            match self.providers.extractor.extract_gigs(page).await {
                Ok(found) => gigs.extend(found),
                Err(e) => {
                    error!(url = %page.url, provider = e.provider(), error = %e, "Gig extraction failed");
                    stats.errors += 1;
                }
            }
        }
        stats.gigs_extracted = gigs.len();

        for gig in &gigs {
            match self.persist(gig).await {
                Ok(Persisted::Created) => stats.gigs_created += 1,
                Ok(Persisted::Skipped) => stats.gigs_skipped += 1,
                Err(e) => {
                    error!(
                        title = %gig.title,
                        date = %gig.date,
                        provider = e.provider(),
                        error = %e,
                        "Failed to save gig"
                    );
                    stats.errors += 1;
                }
            }
        }

        info!(
            ?stats,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Gig sync finished"
        );
        Ok(stats)
    }

    async fn persist(&self, gig: &Gig) -> Result<Persisted, ProviderError> {
        let store = &self.providers.store;
        if let Some(id) = store.find_gig(&gig.title, gig.date).await? {
            info!(id, title = %gig.title, "Gig already stored; skipping");
            return Ok(Persisted::Skipped);
        }
        let venue_id = store.get_or_create_venue(&gig.venue_name).await?;
        store.create_gig(gig, venue_id).await?;
        Ok(Persisted::Created)
    }
}

/// The search query for a run starting on `today`.
pub fn search_query(today: NaiveDate) -> String {
    format!(
        "{BASE_QUERY} {}",
        date_range_query(today, SEARCH_DAYS_AHEAD)
    )
}

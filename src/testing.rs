//! In-memory fakes for every provider capability.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::ProviderError;
use crate::extraction::{ExtractionClient, ReasoningEngine};
use crate::models::{EntityId, Gig, ScrapedPage, SearchResult, Venue};
use crate::scrapers::ScraperClient;
use crate::search::SearchClient;
use crate::store::GigStore;

pub fn sample_gig() -> Gig {
    Gig {
        title: "Nick Cave".into(),
        date: NaiveDate::from_ymd_opt(2026, 2, 15)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap(),
        venue_name: "Gagarin 205".into(),
        description: None,
        price: Some("€45".into()),
        source_url: Some("https://www.more.com/gr/tickets/music/".into()),
        image_url: None,
    }
}

#[derive(Default)]
pub struct MockSearch {
    results: Vec<SearchResult>,
    error: Option<ProviderError>,
    gate: Option<Arc<Notify>>,
}

impl MockSearch {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Hold every search until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl SearchClient for MockSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>, ProviderError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.results.iter().take(max_results).cloned().collect()),
        }
    }
}

/// Serves canned pages by URL; unknown URLs fail.
pub struct MockScraper {
    pages: Vec<ScrapedPage>,
}

impl MockScraper {
    pub fn new(pages: Vec<ScrapedPage>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl ScraperClient for MockScraper {
    async fn fetch(&self, url: &str) -> ScrapedPage {
        self.pages
            .iter()
            .find(|p| p.url == url)
            .cloned()
            .unwrap_or_else(|| ScrapedPage::failed(url, "no canned page"))
    }
}

/// Filters to a fixed URL list and extracts the same gigs from every page.
pub struct MockExtractor {
    urls: Vec<String>,
    gigs: Vec<Gig>,
    pub fail_filter: Option<ProviderError>,
    pub fail_extract_for: Vec<String>,
    pub extract_calls: Arc<AtomicUsize>,
}

impl MockExtractor {
    pub fn new(urls: Vec<String>, gigs: Vec<Gig>) -> Self {
        Self {
            urls,
            gigs,
            fail_filter: None,
            fail_extract_for: Vec::new(),
            extract_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ExtractionClient for MockExtractor {
    async fn filter_urls(&self, _results: &[SearchResult]) -> Result<Vec<String>, ProviderError> {
        match &self.fail_filter {
            Some(e) => Err(e.clone()),
            None => Ok(self.urls.clone()),
        }
    }

    async fn extract_gigs(&self, page: &ScrapedPage) -> Result<Vec<Gig>, ProviderError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_extract_for.contains(&page.url) {
            return Err(ProviderError::transient("mock", "engine unavailable"));
        }
        Ok(self.gigs.clone())
    }
}

/// Replays scripted answers, then falls back to a fixed one.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    fallback: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    pub fn always(answer: &str) -> Self {
        Self {
            fallback: Some(answer.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| ProviderError::fatal("mock", "script exhausted"))
    }
}

#[derive(Default)]
struct Tables {
    next_id: EntityId,
    venues: Vec<(EntityId, Venue)>,
    gigs: Vec<(EntityId, Gig, EntityId)>,
}

/// A [`GigStore`] backed by vectors, counting creates.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_titles: Mutex<Vec<String>>,
    venue_creates: AtomicUsize,
    gig_creates: AtomicUsize,
}

impl MemoryStore {
    pub fn fail_gig_titles(&self, titles: &[&str]) {
        self.failing_titles
            .lock()
            .unwrap()
            .extend(titles.iter().map(|t| t.to_string()));
    }

    pub fn venue_creates(&self) -> usize {
        self.venue_creates.load(Ordering::SeqCst)
    }

    pub fn gig_creates(&self) -> usize {
        self.gig_creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GigStore for MemoryStore {
    async fn find_venue_by_name(&self, name: &str) -> Result<Option<(EntityId, Venue)>, ProviderError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.venues.iter().find(|(_, v)| v.name == name).cloned())
    }

    async fn create_venue(&self, venue: &Venue) -> Result<EntityId, ProviderError> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.venues.push((id, venue.clone()));
        self.venue_creates.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn find_gig(&self, title: &str, date: NaiveDateTime) -> Result<Option<EntityId>, ProviderError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .gigs
            .iter()
            .find(|(_, g, _)| g.title == title && g.date.date() == date.date())
            .map(|(id, _, _)| *id))
    }

    async fn create_gig(&self, gig: &Gig, venue_id: EntityId) -> Result<EntityId, ProviderError> {
        if self.failing_titles.lock().unwrap().contains(&gig.title) {
            return Err(ProviderError::fatal("mock", "HTTP 400: validation failed"));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.gigs.push((id, gig.clone(), venue_id));
        self.gig_creates.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_get_or_create_venue_creates_once() {
        let store = MemoryStore::default();
        let first = store.get_or_create_venue("Gagarin 205").await.unwrap();
        let second = store.get_or_create_venue("Gagarin 205").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.venue_creates(), 1);
    }
}

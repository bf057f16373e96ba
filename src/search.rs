//! Web search (Pass 1, step 1).
//!
//! [`SearchClient`] is the capability the pipeline depends on;
//! [`BraveSearch`] implements it against the Brave Web Search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::{ProviderError, check_status};
use crate::models::SearchResult;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "brave";
const DEFAULT_BASE_URL: &str = "https://api.search.brave.com";

/// Brave returns at most this many web results per request.
pub const MAX_RESULTS_PER_REQUEST: usize = 20;

/// Issues one query and returns ranked results.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Results in provider relevance order, at most `max_results` of them.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    description: Option<String>,
}

/// Brave Web Search API client.
#[derive(Debug, Clone)]
pub struct BraveSearch {
    http: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl BraveSearch {
    pub fn new(http: Client, api_key: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry,
        }
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn search_once(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let url = format!("{}/res/v1/web/search", self.base_url);
        let count = count.to_string();
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let body: BraveResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        Ok(body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                description: r.description,
            })
            .collect())
    }
}

#[async_trait]
impl SearchClient for BraveSearch {
    #[instrument(level = "info", skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let t0 = Instant::now();
        let count = max_results.min(MAX_RESULTS_PER_REQUEST);

        let mut results = self
            .retry
            .run("brave.search", || self.search_once(query, count))
            .await?;
        results.truncate(max_results);

        info!(
            count = results.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Search returned results"
        );
        debug!(urls = ?results.iter().map(|r| &r.url).collect::<Vec<_>>(), "Search result URLs");
        Ok(results)
    }
}

//! HTTP surface: health, manual trigger, and run status.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `GET` | `/` | endpoint list |
//! | `GET` | `/health` | liveness and build info |
//! | `POST` | `/api/sync` | run the pipeline now and answer with its stats |
//! | `GET` | `/api/sync/status` | whether a run is in flight, and the last run |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::runner::{SyncRunner, Trigger, TriggerError};

pub const SERVICE_NAME: &str = "gig_crawler";

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SyncRunner>,
    pub environment: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sync", post(trigger_sync))
        .route("/api/sync/status", get(sync_status))
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "endpoints": {
            "health": "GET /health",
            "sync": "POST /api/sync",
            "status": "GET /api/sync/status"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
    }))
}

async fn trigger_sync(State(state): State<AppState>) -> Response {
    info!("Manual sync requested");
    match state.runner.trigger_detached(Trigger::Manual).await {
        Ok(stats) => Json(json!({
            "status": "success",
            "message": "Gig sync completed",
            "stats": stats,
        }))
        .into_response(),
        Err(TriggerError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({
                "status": "already_running",
                "message": "A sync is already in progress",
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Manual sync failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn sync_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = if state.runner.is_running() {
        "running"
    } else {
        "idle"
    };
    Json(json!({
        "status": status,
        "last_run": state.runner.last_run().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::SearchResult;
    use crate::pipeline::{Providers, SyncPipeline};
    use crate::models::ScrapedPage;
    use crate::testing::{MemoryStore, MockExtractor, MockScraper, MockSearch, sample_gig};
    use std::time::Duration;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn state(search: MockSearch) -> AppState {
        let providers = Providers {
            search: Arc::new(search),
            scraper: Arc::new(MockScraper::new(vec![])),
            extractor: Arc::new(MockExtractor::new(vec![], vec![])),
            store: Arc::new(MemoryStore::default()),
        };
        AppState {
            runner: Arc::new(SyncRunner::new(SyncPipeline::new(
                providers,
                20,
                chrono_tz::Europe::Athens,
            ))),
            environment: "test".into(),
        }
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(state(MockSearch::default())), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["environment"], "test");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_manual_sync_returns_stats() {
        let search = MockSearch::returning(vec![SearchResult {
            url: "https://a.gr".into(),
            title: "A".into(),
            description: None,
        }]);
        let (status, body) = call(router(state(search)), "POST", "/api/sync").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["stats"]["search_results"], 1);
        assert_eq!(body["stats"]["filtered_urls"], 0);
    }

    #[tokio::test]
    async fn test_stage_failure_is_500() {
        let search = MockSearch::failing(ProviderError::fatal("brave", "HTTP 401"));
        let (status, body) = call(router(state(search)), "POST", "/api/sync").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("search stage failed"));
    }

    #[tokio::test]
    async fn test_sync_while_running_is_409() {
        let gate = Arc::new(Notify::new());
        let state = state(MockSearch::default().gated(gate.clone()));
        let app = router(state.clone());

        let first = tokio::spawn(call(app.clone(), "POST", "/api/sync"));
        while !state.runner.is_running() {
            tokio::task::yield_now().await;
        }

        let (status, body) = call(app.clone(), "POST", "/api/sync").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "already_running");

        let (_, running) = call(app.clone(), "GET", "/api/sync/status").await;
        assert_eq!(running["status"], "running");

        gate.notify_one();
        let (status, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);

        let (_, idle) = call(app, "GET", "/api/sync/status").await;
        assert_eq!(idle["status"], "idle");
        assert_eq!(idle["last_run"]["trigger"], "manual");
    }

    #[tokio::test]
    async fn test_client_disconnect_does_not_cancel_run() {
        let url = "https://www.more.com/gr/tickets/music/";
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MemoryStore::default());
        let providers = Providers {
            search: Arc::new(
                MockSearch::returning(vec![SearchResult {
                    url: url.into(),
                    title: "More.com music".into(),
                    description: None,
                }])
                .gated(gate.clone()),
            ),
            scraper: Arc::new(MockScraper::new(vec![ScrapedPage::fetched(
                url,
                Some("Nick Cave 15/02/2026 Gagarin 205".into()),
                String::new(),
            )])),
            extractor: Arc::new(MockExtractor::new(vec![url.into()], vec![sample_gig()])),
            store: store.clone(),
        };
        let runner = Arc::new(SyncRunner::new(SyncPipeline::new(
            providers,
            20,
            chrono_tz::Europe::Athens,
        )));
        let app = router(AppState {
            runner: runner.clone(),
            environment: "test".into(),
        });

        // The client gives up while the run is still searching.
        let hung_up = tokio::time::timeout(
            Duration::from_millis(50),
            call(app, "POST", "/api/sync"),
        )
        .await;
        assert!(hung_up.is_err());
        assert!(runner.is_running());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while runner.last_run().await.is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let record = runner.last_run().await.unwrap();
        assert_eq!(record.trigger, Trigger::Manual);
        assert_eq!(record.stats.unwrap().gigs_created, 1);
        assert_eq!(store.gig_creates(), 1);
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_status_before_any_run() {
        let (status, body) =
            call(router(state(MockSearch::default())), "GET", "/api/sync/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert!(body["last_run"].is_null());
    }
}

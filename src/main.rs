//! # Gig Crawler
//!
//! Discovers live-music gigs in Athens and syncs them into a Strapi CMS.
//!
//! ## Features
//!
//! - Finds candidate pages with the Brave Search API
//! - Lets Gemini pick the pages that actually list upcoming events
//! - Scrapes those pages concurrently and extracts readable text
//! - Has Gemini turn each page into structured gigs
//! - Writes gigs and venues to Strapi, skipping ones already stored
//! - Runs on a cron schedule, on demand over HTTP, or once from the CLI
//!
//! ## Usage
//!
//! ```sh
//! gig_crawler              # serve the API and run on the schedule
//! gig_crawler --run-once   # one sync, stats printed as JSON
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: one web query for upcoming gigs in the target month range
//! 2. **Filter**: the engine keeps the most promising result URLs
//! 3. **Scrape**: every kept URL is fetched at once
//! 4. **Extract**: the engine pulls gigs out of each page
//! 5. **Persist**: each gig is deduplicated and written with its venue

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod extraction;
mod gemini;
mod models;
mod pipeline;
mod prompts;
mod retry;
mod runner;
mod scheduler;
mod scrapers;
mod search;
mod server;
mod store;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use extraction::GigExtractor;
use gemini::GeminiEngine;
use pipeline::{Providers, SyncPipeline};
use retry::RetryPolicy;
use runner::{SyncRunner, Trigger};
use scrapers::HttpScraper;
use search::BraveSearch;
use server::AppState;
use store::StrapiStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %args.environment,
        model = %args.gemini_model,
        timezone = %args.timezone,
        "gig_crawler starting up"
    );

    let runner = Arc::new(SyncRunner::new(build_pipeline(&args)?));

    if args.run_once {
        let stats = runner.trigger(Trigger::Manual).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let mut jobs = scheduler::start(runner.clone(), &args.cron_schedule, args.timezone).await?;

    let state = AppState {
        runner,
        environment: args.environment.clone(),
    };
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP API listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API stopped; shutting down scheduler");
    jobs.shutdown().await?;
    Ok(())
}

/// Wire the concrete providers into a pipeline.
fn build_pipeline(args: &Cli) -> Result<SyncPipeline, Box<dyn Error>> {
    let http = Client::builder()
        .timeout(Duration::from_secs(args.http_timeout_secs))
        .user_agent(scrapers::readable::USER_AGENT)
        .build()?;
    let mut retry = RetryPolicy {
        max_attempts: args.retry_max_attempts.max(1),
        ..RetryPolicy::default()
    };
    if let Some(secs) = args.retry_max_delay_secs {
        retry = retry.with_max_delay(Duration::from_secs(secs));
    }

    let engine = GeminiEngine::new(http.clone(), &args.gemini_api_key, &args.gemini_model);
    let providers = Providers {
        search: Arc::new(BraveSearch::new(http.clone(), &args.brave_api_key, retry.clone())),
        scraper: Arc::new(HttpScraper::new(http.clone())),
        extractor: Arc::new(GigExtractor::new(engine, retry.clone())),
        store: Arc::new(StrapiStore::new(
            http,
            &args.strapi_api_url,
            &args.strapi_api_token,
            retry,
        )),
    };
    Ok(SyncPipeline::new(providers, args.max_results, args.timezone))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}

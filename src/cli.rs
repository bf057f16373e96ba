//! Command-line interface definitions for the gig crawler.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file in the working directory is loaded first).

use chrono_tz::Tz;
use clap::Parser;

/// Configuration for the gig crawler.
///
/// # Examples
///
/// ```sh
/// # Serve the trigger API and run nightly at 02:00 Athens time
/// gig_crawler
///
/// # One sync, stats printed as JSON
/// gig_crawler --run-once
///
/// # Every six hours, in UTC
/// CRON_SCHEDULE="0 */6 * * *" TIMEZONE=UTC gig_crawler
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Brave Search API key
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: String,

    /// Google Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini model used for URL filtering and extraction
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Base URL of the Strapi CMS
    #[arg(long, env = "STRAPI_API_URL")]
    pub strapi_api_url: String,

    /// Strapi API token
    #[arg(long, env = "STRAPI_API_TOKEN", hide_env_values = true)]
    pub strapi_api_token: String,

    /// Cron expression for scheduled syncs (5-field, or 6/7-field with seconds)
    #[arg(long, env = "CRON_SCHEDULE", default_value = "0 2 * * *")]
    pub cron_schedule: String,

    /// IANA timezone for the schedule and the search date range
    #[arg(long, env = "TIMEZONE", default_value = "Europe/Athens", value_parser = parse_timezone)]
    pub timezone: Tz,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Port for the HTTP API
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Deployment environment reported by /health
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Timeout for each outbound HTTP call, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Attempts per provider call, including the first
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value_t = 3)]
    pub retry_max_attempts: u32,

    /// Upper bound for a single retry delay, in seconds (uncapped if unset)
    #[arg(long, env = "RETRY_MAX_DELAY_SECS")]
    pub retry_max_delay_secs: Option<u64>,

    /// Number of search results to request
    #[arg(long, env = "SEARCH_MAX_RESULTS", default_value_t = 20)]
    pub max_results: usize,

    /// Run a single sync, print its stats and exit
    #[arg(long)]
    pub run_once: bool,
}

fn parse_timezone(value: &str) -> Result<Tz, String> {
    value
        .parse::<Tz>()
        .map_err(|_| format!("unknown timezone: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "gig_crawler",
        "--brave-api-key",
        "b-key",
        "--gemini-api-key",
        "g-key",
        "--strapi-api-url",
        "http://localhost:1337",
        "--strapi-api-token",
        "s-token",
    ];

    #[test]
    fn test_cli_parsing() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--timezone",
            "UTC",
            "--cron-schedule",
            "0 */6 * * *",
            "--port",
            "8080",
            "--run-once",
        ]);
        let cli = Cli::parse_from(args);

        assert_eq!(cli.brave_api_key, "b-key");
        assert_eq!(cli.strapi_api_url, "http://localhost:1337");
        assert_eq!(cli.timezone, chrono_tz::UTC);
        assert_eq!(cli.cron_schedule, "0 */6 * * *");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.retry_max_attempts, 3);
        assert_eq!(cli.retry_max_delay_secs, None);
        assert!(cli.run_once);
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--timezone", "Mars/Olympus_Mons"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let args = ["gig_crawler", "--gemini-api-key", "g-key"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Athens"), Ok(chrono_tz::Europe::Athens));
        assert!(parse_timezone("Athens").is_err());
    }
}

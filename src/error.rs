//! Error taxonomy shared by every provider client.
//!
//! Provider calls fail in one of three ways:
//!
//! | Kind | Typical cause | Retried |
//! |------|---------------|---------|
//! | [`ProviderError::Transient`] | network, timeout, 408/429/5xx | yes |
//! | [`ProviderError::Fatal`] | bad credentials, other 4xx | no |
//! | [`ProviderError::Parse`] | body does not match the provider contract | no |
//!
//! Pipeline-level failures live in [`SyncError`]. Only the two single-call
//! stages (search and URL filtering) can produce one.

use reqwest::StatusCode;
use thiserror::Error;

/// A failed call to an external provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{provider}: transient failure: {message}")]
    Transient {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: request rejected: {message}")]
    Fatal {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: unexpected response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn transient(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Transient {
            provider,
            message: message.into(),
        }
    }

    pub fn fatal(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Fatal {
            provider,
            message: message.into(),
        }
    }

    pub fn parse(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            provider,
            message: message.into(),
        }
    }

    /// Classify a transport-level `reqwest` failure.
    ///
    /// Connection problems and timeouts are transient. A failure to decode
    /// the body is a contract violation. Anything else (builder errors,
    /// invalid URLs) will not get better by retrying.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(provider, status, &err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            Self::transient(provider, err.to_string())
        } else if err.is_decode() {
            Self::parse(provider, err.to_string())
        } else {
            Self::fatal(provider, err.to_string())
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(provider: &'static str, status: StatusCode, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", crate::utils::truncate_for_log(body, 300));
        if status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
        {
            Self::transient(provider, message)
        } else {
            Self::fatal(provider, message)
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::Transient { provider, .. }
            | Self::Fatal { provider, .. }
            | Self::Parse { provider, .. } => provider,
        }
    }
}

/// A failure that aborts a whole pipeline run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("search stage failed: {0}")]
    Search(#[source] ProviderError),

    #[error("url filtering stage failed: {0}")]
    Filter(#[source] ProviderError),
}

/// Read the body of a non-success response and turn it into an error.
///
/// Successful responses pass through untouched.
pub async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(provider, status, &body))
}

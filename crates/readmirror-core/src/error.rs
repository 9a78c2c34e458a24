//! Error types for readmirror.
//!
//! The taxonomy follows how a sync run treats failures: source fetch errors
//! abort the run, per-item errors are caught by the dispatcher, and
//! enrichment errors only drop the enriched field.

use thiserror::Error;

/// Main error type for the readmirror library.
#[derive(Debug, Error)]
pub enum MirrorError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited by {service}, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    #[error("{service} API error ({status_code:?}): {message}")]
    Api {
        service: String,
        status_code: Option<u16>,
        message: String,
    },

    #[error("Session for {service} has expired, refresh the credentials")]
    AuthExpired { service: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Reconciliation errors
    #[error("Failed to fetch {source_name}: {message}")]
    SourceFetch {
        source_name: String,
        message: String,
    },

    #[error("Failed to sync item {item_id}: {message}")]
    ItemSync { item_id: String, message: String },

    #[error("Enrichment lookup failed: {message}")]
    Enrichment { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for readmirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MirrorError::Timeout(std::time::Duration::from_secs(0))
        } else {
            MirrorError::Network {
                message: err.to_string(),
                cause: err.url().map(|u| u.to_string()),
            }
        }
    }
}

impl MirrorError {
    /// Wrap a gathering failure so the run aborts with the collaborator named.
    pub fn source_fetch(source_name: &str, err: MirrorError) -> Self {
        MirrorError::SourceFetch {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MirrorError::Network { .. }
            | MirrorError::Timeout(_)
            | MirrorError::RateLimited { .. } => true,
            MirrorError::Api {
                status_code: Some(code),
                ..
            } => matches!(code, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Check if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MirrorError::SourceFetch { .. }
                | MirrorError::Config { .. }
                | MirrorError::AuthExpired { .. }
        )
    }
}

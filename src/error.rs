//! Error types and handling for `snowcast`

use thiserror::Error;

/// Main error type for the `snowcast` library
#[derive(Error, Debug)]
pub enum SnowcastError {
    /// Upstream answered with a non-2xx status
    #[error("HTTP error {status} for {url}")]
    Http { url: String, status: u16 },

    /// Caller predicate rejected a structurally valid body
    #[error("Response from {url} was rejected by its validator")]
    Validation { url: String },

    /// Malformed JSON or missing expected fields
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Transport failure before a status was received (timeouts, resets)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Response store errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Work stopped because shutdown was requested
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SnowcastError {
    /// Create a new HTTP status error
    pub fn http<S: Into<String>>(url: S, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(url: S) -> Self {
        Self::Validation { url: url.into() }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn network<S: Into<String>, M: Into<String>>(url: S, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the fetch loop may try again after this error.
    ///
    /// Parse errors mean the upstream contract changed, so they fail fast.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Validation { .. } | Self::Network { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SnowcastError::Http { status, .. } => {
                format!("The forecast provider answered with HTTP {status}.")
            }
            SnowcastError::Validation { .. } => {
                "The forecast provider returned stale or unexpected data.".to_string()
            }
            SnowcastError::Parse { message } => {
                format!("The forecast provider changed its format: {message}")
            }
            SnowcastError::Network { .. } => {
                "Unable to reach the forecast provider. Please check your internet connection."
                    .to_string()
            }
            SnowcastError::Cache { .. } => {
                "Response cache failed. You may need to remove the cache directory.".to_string()
            }
            SnowcastError::Config { message } => {
                format!("Configuration error: {message}")
            }
            SnowcastError::Cancelled => "The build was cancelled.".to_string(),
            SnowcastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<anyhow::Error> for SnowcastError {
    fn from(err: anyhow::Error) -> Self {
        SnowcastError::Cache {
            message: err.to_string(),
        }
    }
}

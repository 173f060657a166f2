//! Error types for GPTMaker API client

use std::fmt;
use std::sync::Arc;

/// Errors that can occur when interacting with the GPTMaker API
///
/// Cloneable so that a single failed request can be reported to every
/// caller that was waiting on it.
#[derive(Debug, Clone)]
pub enum GptMakerError {
    /// HTTP request failed
    Http(Arc<reqwest::Error>),
    /// Failed to parse JSON response
    Json(Arc<serde_json::Error>),
    /// The API answered with a non-success status
    Api { status: u16, message: String },
}

impl fmt::Display for GptMakerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "GPTMaker HTTP error: {}", e),
            Self::Json(e) => write!(f, "GPTMaker JSON parse error: {}", e),
            Self::Api { status, message } => {
                write!(f, "GPTMaker API error ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for GptMakerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            Self::Json(e) => Some(e.as_ref()),
            Self::Api { .. } => None,
        }
    }
}

impl From<reqwest::Error> for GptMakerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for GptMakerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(Arc::new(e))
    }
}

/// Result type for GPTMaker API operations
pub type Result<T> = std::result::Result<T, GptMakerError>;

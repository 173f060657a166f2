use std::fmt;
use std::sync::Arc;

/// Errors from the Airtable client
#[derive(Debug, Clone)]
pub enum AirtableError {
    Http(Arc<reqwest::Error>),
    Api { status: u16, message: String },
}

impl fmt::Display for AirtableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api { status, message } => write!(f, "Airtable API error ({status}): {message}"),
        }
    }
}

impl std::error::Error for AirtableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AirtableError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, AirtableError>;

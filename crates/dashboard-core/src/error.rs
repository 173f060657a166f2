//! Error types for the dashboard core

use std::fmt;

#[derive(Debug, Clone)]
pub enum DashboardError {
    /// Chat data source failed
    GptMaker(gptmaker_api::GptMakerError),
    /// User directory failed
    Airtable(airtable_client::AirtableError),
    /// Missing or malformed configuration
    Config(String),
    /// A polling interval of zero was requested
    InvalidPollingFrequency(u64),
    /// No user matched the supplied email and password
    InvalidCredentials,
    /// The signed-in user has no GPTMaker workspace
    MissingWorkspace,
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GptMaker(e) => write!(f, "{}", e),
            Self::Airtable(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::InvalidPollingFrequency(ms) => {
                write!(f, "Invalid polling frequency: {}ms", ms)
            }
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::MissingWorkspace => write!(f, "User has no GPTMaker workspace"),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GptMaker(e) => Some(e),
            Self::Airtable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<gptmaker_api::GptMakerError> for DashboardError {
    fn from(e: gptmaker_api::GptMakerError) -> Self {
        Self::GptMaker(e)
    }
}

impl From<airtable_client::AirtableError> for DashboardError {
    fn from(e: airtable_client::AirtableError) -> Self {
        Self::Airtable(e)
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

//! Error types for the watcher binary

use std::fmt;

#[derive(Debug)]
pub enum WatchError {
    /// Dashboard core error
    Dashboard(dashboard_core::DashboardError),
    /// Configuration error
    Config(String),
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dashboard(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dashboard(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<dashboard_core::DashboardError> for WatchError {
    fn from(e: dashboard_core::DashboardError) -> Self {
        Self::Dashboard(e)
    }
}

impl From<tracing_subscriber::filter::ParseError> for WatchError {
    fn from(e: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = WatchError::Config("GPTMAKER_WORKSPACE_ID is not set".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: GPTMAKER_WORKSPACE_ID is not set"
        );
    }

    #[test]
    fn test_dashboard_error_is_source() {
        let err: WatchError = dashboard_core::DashboardError::InvalidCredentials.into();
        assert!(std::error::Error::source(&err).is_some());
    }
}

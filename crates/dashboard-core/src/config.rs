use std::env;
use std::time::Duration;

const DEFAULT_GPTMAKER_API_URL: &str = "https://api.gptmaker.ai/v2";

/// Dashboard configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub gptmaker_api_url: String,
    pub gptmaker_api_token: Option<String>,
    pub gptmaker_workspace_id: Option<String>,
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub airtable_users_table: String,
    /// Account to sign in as at startup
    pub dashboard_email: Option<String>,
    pub dashboard_password: Option<String>,
    pub cache_ttl: Duration,
    pub polling_frequency: Duration,
    pub chats_page_size: u32,
    pub poll_include_messages: bool,
}

impl DashboardConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gptmaker_api_url = non_empty("GPTMAKER_API_URL")
            .unwrap_or_else(|| DEFAULT_GPTMAKER_API_URL.to_string());

        let cache_ttl_secs = lookup("CACHE_TTL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300); // 5 minutes

        let polling_frequency_ms = lookup("POLLING_FREQUENCY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(10_000);

        let chats_page_size = lookup("CHATS_PAGE_SIZE")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(50);

        let poll_include_messages = lookup("POLL_INCLUDE_MESSAGES")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            gptmaker_api_url,
            gptmaker_api_token: non_empty("GPTMAKER_API_TOKEN"),
            gptmaker_workspace_id: non_empty("GPTMAKER_WORKSPACE_ID"),
            airtable_api_key: non_empty("AIRTABLE_API_KEY"),
            airtable_base_id: non_empty("AIRTABLE_BASE_ID"),
            airtable_users_table: non_empty("AIRTABLE_USERS_TABLE")
                .unwrap_or_else(|| "Users".to_string()),
            dashboard_email: non_empty("DASHBOARD_EMAIL"),
            dashboard_password: non_empty("DASHBOARD_PASSWORD"),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            polling_frequency: Duration::from_millis(polling_frequency_ms),
            chats_page_size,
            poll_include_messages,
        }
    }

    /// Airtable credentials, when both the key and the base are set
    pub fn airtable_credentials(&self) -> Option<(&str, &str)> {
        match (&self.airtable_base_id, &self.airtable_api_key) {
            (Some(base), Some(key)) => Some((base.as_str(), key.as_str())),
            _ => None,
        }
    }
}

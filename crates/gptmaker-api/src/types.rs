//! GPTMaker API response types

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Epoch values below this are taken to be seconds rather than milliseconds
const EPOCH_SECONDS_CUTOFF: i64 = 1_000_000_000_000;

/// List endpoints answer either `{ "success": true, "data": [...] }` or a
/// bare JSON array depending on the route
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Wrapped {
        #[serde(default)]
        success: Option<bool>,
        data: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Wrapped { data, .. } => data,
            Self::Bare(items) => items,
        }
    }
}

/// A timestamp as the API sends it: epoch number or date string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Timestamp {
    /// Convert to epoch milliseconds, or 0 when the value cannot be read
    pub fn to_epoch_millis(&self) -> i64 {
        match self {
            Self::Integer(n) => normalize_epoch(*n),
            Self::Float(f) if f.is_finite() => normalize_epoch(*f as i64),
            Self::Float(_) => 0,
            Self::Text(s) => parse_text_timestamp(s.trim()).unwrap_or(0),
        }
    }
}

fn normalize_epoch(n: i64) -> i64 {
    if n <= 0 {
        0
    } else if n < EPOCH_SECONDS_CUTOFF {
        n.saturating_mul(1000)
    } else {
        n
    }
}

fn parse_text_timestamp(s: &str) -> Option<i64> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(normalize_epoch(n));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// A single message in a chat thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "timestamp")]
    pub time: Option<Timestamp>,
}

impl Message {
    /// Epoch milliseconds of the message, 0 when absent
    pub fn time_millis(&self) -> i64 {
        self.time.as_ref().map(Timestamp::to_epoch_millis).unwrap_or(0)
    }
}

/// A conversation between an agent and an end user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(default, alias = "chatId")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub user_picture: Option<String>,
    #[serde(default)]
    pub whatsapp_phone: Option<String>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub un_read_count: Option<u32>,
    #[serde(default)]
    pub time: Option<Timestamp>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Chat {
    /// The chat's identifier, treating an empty string as missing
    pub fn chat_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// A configured chatbot agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub communication_type: Option<String>,
    #[serde(default)]
    pub job_name: Option<String>,
}

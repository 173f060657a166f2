//! Chatbot admin dashboard core
//!
//! Cached access to GPTMaker chat data, a polling loop that diffs the chat
//! list to surface new chats and new messages, and the user directory used
//! for dashboard sign-in.

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod polling;
pub mod snapshot;
pub mod source;
pub mod users;

pub use auth::{AuthService, Session, UserDirectory};
pub use config::DashboardConfig;
pub use data::{DashboardData, DashboardStats};
pub use error::{DashboardError, Result};
pub use events::{ChatWithNewMessages, DashboardEvent, EventBus};
pub use polling::{ChatPoller, TickOutcome, DEFAULT_POLLING_FREQUENCY};
pub use snapshot::{ChatChange, ChatSnapshot};
pub use source::{ChatQuery, ChatSource};
pub use users::{normalize_user, UserRecord};

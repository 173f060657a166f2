//! Rust client for the GPTMaker API
//!
//! Typed bindings for the parts of the GPTMaker v2 API the dashboard reads:
//! workspace chats, chat message threads and agents.
//!
//! # Example
//!
//! ```no_run
//! use gptmaker_api::GptMakerClient;
//!
//! # async fn example() -> Result<(), gptmaker_api::GptMakerError> {
//! let client = GptMakerClient::new("my-api-token");
//!
//! let chats = client.get_chats("workspace-id", 1, 50).await?;
//! for chat in &chats {
//!     let messages = client.get_chat_messages(chat.id.as_deref().unwrap_or_default()).await?;
//!     println!("{:?}: {} messages", chat.name, messages.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - `GET /workspace/{workspaceId}/chats` - List chats in a workspace
//! - `GET /chat/{chatId}/messages` - Get the message thread of a chat
//! - `GET /workspace/{workspaceId}/agents` - List agents in a workspace

mod client;
mod error;
mod types;

pub use client::GptMakerClient;
pub use error::{GptMakerError, Result};
pub use types::{Agent, Chat, ListResponse, Message, Timestamp};

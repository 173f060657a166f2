//! The chat data source seen by the poller

use std::future::Future;
use std::sync::Arc;

use gptmaker_api::Chat;

use crate::error::Result;

/// Parameters of a chat list query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatQuery {
    pub page: u32,
    pub page_size: u32,
    /// Attach each chat's message thread to the result
    pub include_messages: bool,
}

impl Default for ChatQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
            include_messages: true,
        }
    }
}

impl ChatQuery {
    /// Cache-key fragment identifying this query
    pub fn key_fragment(&self) -> String {
        format!(
            "{}:{}:{}",
            self.page,
            self.page_size,
            if self.include_messages { "msgs" } else { "bare" }
        )
    }
}

/// Something that can list chats, either through a cache or fresh
pub trait ChatSource: Send + Sync + 'static {
    /// List chats, possibly answered from cache
    fn get_chats(&self, query: &ChatQuery) -> impl Future<Output = Result<Vec<Chat>>> + Send;

    /// List chats, always going to the upstream service
    fn get_chats_fresh(&self, query: &ChatQuery)
        -> impl Future<Output = Result<Vec<Chat>>> + Send;
}

impl<T: ChatSource> ChatSource for Arc<T> {
    fn get_chats(&self, query: &ChatQuery) -> impl Future<Output = Result<Vec<Chat>>> + Send {
        T::get_chats(self, query)
    }

    fn get_chats_fresh(
        &self,
        query: &ChatQuery,
    ) -> impl Future<Output = Result<Vec<Chat>>> + Send {
        T::get_chats_fresh(self, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        let query = ChatQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 50);
        assert!(query.include_messages);
        assert_eq!(query.key_fragment(), "1:50:msgs");
    }

    #[test]
    fn test_key_fragment_distinguishes_queries() {
        let bare = ChatQuery {
            include_messages: false,
            ..Default::default()
        };
        assert_ne!(bare.key_fragment(), ChatQuery::default().key_fragment());
    }
}

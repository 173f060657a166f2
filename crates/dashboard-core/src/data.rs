//! Cached access to GPTMaker data for the dashboard

use std::sync::Arc;
use std::time::Duration;

use fetch_cache::{CacheStats, FetchCache};
use gptmaker_api::{Agent, Chat, GptMakerClient, GptMakerError, Message};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::source::{ChatQuery, ChatSource};

/// Headline numbers for the dashboard overview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_chats: usize,
    pub open_chats: usize,
    pub unread_chats: usize,
    pub total_messages: usize,
    pub total_agents: usize,
    pub active_agents: usize,
}

impl DashboardStats {
    pub fn compute(chats: &[Chat], agents: &[Agent]) -> Self {
        Self {
            total_chats: chats.len(),
            open_chats: chats.iter().filter(|c| c.finished != Some(true)).count(),
            unread_chats: chats
                .iter()
                .filter(|c| c.un_read_count.unwrap_or(0) > 0)
                .count(),
            total_messages: chats.iter().map(|c| c.messages.len()).sum(),
            total_agents: agents.len(),
            active_agents: agents.iter().filter(|a| a.active == Some(true)).count(),
        }
    }
}

type SharedList<T> = Arc<Vec<T>>;

/// GPTMaker data access for one workspace, de-duplicated and cached
///
/// Each resource has its own cache; keys carry a `chats:`, `messages:` or
/// `agents:` prefix so one prefix clears one resource.
pub struct DashboardData {
    api: Arc<GptMakerClient>,
    workspace_id: String,
    chats: FetchCache<SharedList<Chat>, GptMakerError>,
    messages: FetchCache<SharedList<Message>, GptMakerError>,
    agents: FetchCache<SharedList<Agent>, GptMakerError>,
}

impl DashboardData {
    pub fn new(api: GptMakerClient, workspace_id: &str, cache_ttl: Duration) -> Self {
        Self {
            api: Arc::new(api),
            workspace_id: workspace_id.to_string(),
            chats: FetchCache::with_ttl(cache_ttl),
            messages: FetchCache::with_ttl(cache_ttl),
            agents: FetchCache::with_ttl(cache_ttl),
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    fn chats_key(&self, query: &ChatQuery) -> String {
        format!("chats:{}:{}", self.workspace_id, query.key_fragment())
    }

    /// List chats, served from cache while fresh
    pub async fn get_chats(&self, query: &ChatQuery) -> Result<Vec<Chat>> {
        let api = self.api.clone();
        let workspace_id = self.workspace_id.clone();
        let owned_query = query.clone();

        let chats = self
            .chats
            .get_or_fetch(&self.chats_key(query), move || async move {
                fetch_chats(&api, &workspace_id, &owned_query)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(chats.as_ref().clone())
    }

    /// List chats straight from GPTMaker, bypassing the cache
    ///
    /// The result replaces the cached entry for the same query, including
    /// over a slower cached fetch still in flight.
    pub async fn get_chats_fresh(&self, query: &ChatQuery) -> Result<Vec<Chat>> {
        let chats = fetch_chats(&self.api, &self.workspace_id, query).await?;
        self.chats
            .insert(&self.chats_key(query), Arc::new(chats.clone()))
            .await;
        Ok(chats)
    }

    /// Message thread of one chat, served from cache while fresh
    pub async fn get_chat_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let api = self.api.clone();
        let owned_id = chat_id.to_string();

        let messages = self
            .messages
            .get_or_fetch(&format!("messages:{}", chat_id), move || async move {
                api.get_chat_messages(&owned_id).await.map(Arc::new)
            })
            .await?;
        Ok(messages.as_ref().clone())
    }

    /// Agents of the workspace, served from cache while fresh
    pub async fn get_agents(&self) -> Result<Vec<Agent>> {
        let api = self.api.clone();
        let workspace_id = self.workspace_id.clone();

        let agents = self
            .agents
            .get_or_fetch(&format!("agents:{}", self.workspace_id), move || async move {
                api.get_agents(&workspace_id).await.map(Arc::new)
            })
            .await?;
        Ok(agents.as_ref().clone())
    }

    /// Overview numbers built from the cached chat and agent lists
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let query = ChatQuery::default();
        let (chats, agents) = tokio::try_join!(self.get_chats(&query), self.get_agents())?;
        Ok(DashboardStats::compute(&chats, &agents))
    }

    /// Drop cached results, all of them or those under a key prefix
    /// (`chats:`, `messages:`, `agents:`)
    pub async fn clear_cache(&self, prefix: Option<&str>) -> usize {
        self.chats.clear_cache(prefix).await
            + self.messages.clear_cache(prefix).await
            + self.agents.clear_cache(prefix).await
    }

    /// Combined statistics of the three resource caches
    pub async fn cache_stats(&self) -> CacheStats {
        let (chats, messages, agents) = tokio::join!(
            self.chats.stats(),
            self.messages.stats(),
            self.agents.stats()
        );
        [messages, agents]
            .into_iter()
            .fold(chats, |total, s| CacheStats {
                entries: total.entries + s.entries,
                pending: total.pending + s.pending,
                hits: total.hits + s.hits,
                misses: total.misses + s.misses,
                coalesced: total.coalesced + s.coalesced,
            })
    }
}

impl ChatSource for DashboardData {
    async fn get_chats(&self, query: &ChatQuery) -> Result<Vec<Chat>> {
        DashboardData::get_chats(self, query).await
    }

    async fn get_chats_fresh(&self, query: &ChatQuery) -> Result<Vec<Chat>> {
        DashboardData::get_chats_fresh(self, query).await
    }
}

/// Fetch one page of chats and, when asked, their message threads
async fn fetch_chats(
    api: &GptMakerClient,
    workspace_id: &str,
    query: &ChatQuery,
) -> std::result::Result<Vec<Chat>, GptMakerError> {
    let mut chats = api
        .get_chats(workspace_id, query.page, query.page_size)
        .await?;

    if !query.include_messages {
        return Ok(chats);
    }

    let threads = futures::future::join_all(chats.iter().map(|chat| async move {
        match chat.chat_id() {
            Some(id) if chat.messages.is_empty() => match api.get_chat_messages(id).await {
                Ok(messages) => Some(messages),
                Err(e) => {
                    warn!(chat_id = %id, error = %e, "Failed to load chat messages");
                    None
                }
            },
            _ => None,
        }
    }))
    .await;

    for (chat, thread) in chats.iter_mut().zip(threads) {
        if let Some(messages) = thread {
            chat.messages = messages;
        }
    }

    debug!(workspace = %workspace_id, count = chats.len(), "Fetched chats");
    Ok(chats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gptmaker_api::Timestamp;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_chats(server: &MockServer, chats: serde_json::Value, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/workspace/ws-1/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": chats
            })))
            .expect(expected)
            .mount(server)
            .await;
    }

    fn offline_data() -> DashboardData {
        let api = GptMakerClient::with_timeout(
            "http://127.0.0.1:9",
            "token",
            Duration::from_millis(500),
        );
        DashboardData::new(api, "ws-1", Duration::from_secs(300))
    }

    fn chat(id: &str, messages: usize, finished: bool, unread: u32) -> Chat {
        Chat {
            id: Some(id.to_string()),
            finished: Some(finished),
            un_read_count: Some(unread),
            messages: (0..messages)
                .map(|i| Message {
                    time: Some(Timestamp::Integer(1_700_000_000_000 + i as i64)),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn agent(id: &str, active: bool) -> Agent {
        Agent {
            id: id.to_string(),
            active: Some(active),
            ..Default::default()
        }
    }

    #[test]
    fn test_stats_compute() {
        let chats = vec![chat("a", 3, false, 1), chat("b", 2, true, 0), chat("c", 0, false, 0)];
        let agents = vec![agent("x", true), agent("y", false)];
        let stats = DashboardStats::compute(&chats, &agents);
        assert_eq!(
            stats,
            DashboardStats {
                total_chats: 3,
                open_chats: 2,
                unread_chats: 1,
                total_messages: 5,
                total_agents: 2,
                active_agents: 1,
            }
        );
    }

    #[test]
    fn test_chats_key_includes_workspace_and_query() {
        let data = offline_data();
        assert_eq!(data.chats_key(&ChatQuery::default()), "chats:ws-1:1:50:msgs");
    }

    #[tokio::test]
    async fn test_cached_reads_do_not_hit_network() {
        let data = offline_data();
        let query = ChatQuery::default();
        data.chats
            .insert(&data.chats_key(&query), Arc::new(vec![chat("a", 1, false, 0)]))
            .await;
        data.agents
            .insert("agents:ws-1", Arc::new(vec![agent("x", true)]))
            .await;

        let chats = data.get_chats(&query).await.unwrap();
        assert_eq!(chats.len(), 1);

        let stats = data.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_chats, 1);
        assert_eq!(stats.active_agents, 1);
    }

    #[tokio::test]
    async fn test_fresh_read_bypasses_cache() {
        let data = offline_data();
        let query = ChatQuery::default();
        data.chats
            .insert(&data.chats_key(&query), Arc::new(vec![chat("a", 1, false, 0)]))
            .await;

        assert_ok!(data.get_chats(&query).await);
        assert_err!(data.get_chats_fresh(&query).await);
    }

    #[tokio::test]
    async fn test_clear_cache_by_prefix_forces_refetch() {
        let data = offline_data();
        let query = ChatQuery::default();
        data.chats
            .insert(&data.chats_key(&query), Arc::new(vec![chat("a", 1, false, 0)]))
            .await;
        data.agents
            .insert("agents:ws-1", Arc::new(vec![]))
            .await;

        assert_eq!(data.clear_cache(Some("chats:")).await, 1);
        assert_err!(data.get_chats(&query).await);
        assert_ok!(data.get_agents().await);

        let stats = data.cache_stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_message_threads_attached_per_chat() {
        let server = MockServer::start().await;
        mount_chats(
            &server,
            json!([
                {"id": "c1"},
                {"id": "c2"},
                {"id": "c3", "messages": [{"id": "m0", "time": 1700000000000i64}]}
            ]),
            1,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/chat/c1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "m1", "role": "user", "content": "hi", "time": 1700000000000i64},
                {"id": "m2", "role": "assistant", "content": "hello", "time": 1700000001000i64}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chat/c2/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chat/c3/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let api = GptMakerClient::with_base_url(&server.uri(), "token");
        let data = DashboardData::new(api, "ws-1", Duration::from_secs(300));
        let chats = data.get_chats(&ChatQuery::default()).await.unwrap();

        assert_eq!(chats.len(), 3);
        assert_eq!(chats[0].messages.len(), 2);
        assert_eq!(chats[0].messages[1].content.as_deref(), Some("hello"));
        // A failed thread leaves the chat without messages
        assert!(chats[1].messages.is_empty());
        assert_eq!(chats[2].messages.len(), 1);

        // Served from cache the second time
        assert_eq!(data.get_chats(&ChatQuery::default()).await.unwrap(), chats);
    }

    #[tokio::test]
    async fn test_bare_query_skips_message_threads() {
        let server = MockServer::start().await;
        mount_chats(&server, json!([{"id": "c1"}]), 1).await;
        Mock::given(method("GET"))
            .and(path("/chat/c1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let api = GptMakerClient::with_base_url(&server.uri(), "token");
        let data = DashboardData::new(api, "ws-1", Duration::from_secs(300));
        let query = ChatQuery {
            include_messages: false,
            ..Default::default()
        };
        let chats = data.get_chats(&query).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert!(chats[0].messages.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_read_refreshes_cached_chats() {
        let server = MockServer::start().await;
        mount_chats(&server, json!([{"id": "c1"}, {"id": "c2"}]), 1).await;

        let api = GptMakerClient::with_base_url(&server.uri(), "token");
        let data = DashboardData::new(api, "ws-1", Duration::from_secs(300));
        let query = ChatQuery {
            include_messages: false,
            ..Default::default()
        };
        data.chats
            .insert(&data.chats_key(&query), Arc::new(vec![chat("old", 0, false, 0)]))
            .await;

        let fresh = data.get_chats_fresh(&query).await.unwrap();
        assert_eq!(fresh.len(), 2);
        assert_eq!(data.get_chats(&query).await.unwrap(), fresh);
    }
}

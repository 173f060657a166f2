//! GPTMaker API HTTP client

use crate::error::{GptMakerError, Result};
use crate::types::*;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::error;

/// Client for the GPTMaker conversational-AI API
///
/// Every request carries the workspace API token as a bearer credential.
pub struct GptMakerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GptMakerClient {
    /// Base URL for GPTMaker API v2
    pub const DEFAULT_BASE_URL: &'static str = "https://api.gptmaker.ai/v2";

    /// Create a new client against the public API (30 second timeout)
    pub fn new(token: &str) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, token)
    }

    /// Create a new client against a custom API URL
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    /// Create a new client with a custom timeout
    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the chats of a workspace
    ///
    /// # Arguments
    /// * `workspace_id` - The GPTMaker workspace ID
    /// * `page` - 1-based page number
    /// * `page_size` - Number of chats per page
    pub async fn get_chats(&self, workspace_id: &str, page: u32, page_size: u32) -> Result<Vec<Chat>> {
        let url = self.chats_url(workspace_id, page, page_size);
        let response: ListResponse<Chat> = self.get_json(&url).await?;
        Ok(response.into_items())
    }

    /// Get the message thread of a chat
    ///
    /// # Arguments
    /// * `chat_id` - The chat to read
    pub async fn get_chat_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let url = format!(
            "{}/chat/{}/messages",
            self.base_url,
            urlencoding::encode(chat_id)
        );
        let response: ListResponse<Message> = self.get_json(&url).await?;
        Ok(response.into_items())
    }

    /// List the agents of a workspace
    ///
    /// # Arguments
    /// * `workspace_id` - The GPTMaker workspace ID
    pub async fn get_agents(&self, workspace_id: &str) -> Result<Vec<Agent>> {
        let url = format!(
            "{}/workspace/{}/agents",
            self.base_url,
            urlencoding::encode(workspace_id)
        );
        let response: ListResponse<Agent> = self.get_json(&url).await?;
        Ok(response.into_items())
    }

    fn chats_url(&self, workspace_id: &str, page: u32, page_size: u32) -> String {
        format!(
            "{}/workspace/{}/chats?page={}&pageSize={}",
            self.base_url,
            urlencoding::encode(workspace_id),
            page.max(1),
            page_size
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "GPTMaker request failed");
            return Err(GptMakerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_chats_url() {
        let client = GptMakerClient::new("token");
        assert_eq!(
            client.chats_url("ws-1", 2, 50),
            "https://api.gptmaker.ai/v2/workspace/ws-1/chats?page=2&pageSize=50"
        );
    }

    #[test]
    fn test_chats_url_clamps_page_and_encodes_id() {
        let client = GptMakerClient::with_base_url("http://localhost:8080/", "token");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.chats_url("a b", 0, 10),
            "http://localhost:8080/workspace/a%20b/chats?page=1&pageSize=10"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let client = GptMakerClient::with_timeout(
            "http://127.0.0.1:9",
            "token",
            Duration::from_millis(500),
        );
        let err = client.get_agents("ws").await.unwrap_err();
        assert!(matches!(err, GptMakerError::Http(_)));
    }

    #[tokio::test]
    async fn test_get_chats_sends_token_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspace/ws-1/chats"))
            .and(query_param("page", "2"))
            .and(query_param("pageSize", "25"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [
                    {"id": "c1", "name": "Ana", "unReadCount": 2},
                    {"chatId": "c2", "finished": true}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GptMakerClient::with_base_url(&server.uri(), "secret");
        let chats = client.get_chats("ws-1", 2, 25).await.unwrap();

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].chat_id(), Some("c1"));
        assert_eq!(chats[0].un_read_count, Some(2));
        assert_eq!(chats[1].chat_id(), Some("c2"));
    }

    #[tokio::test]
    async fn test_get_agents_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspace/ws-1/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a1", "name": "Support", "active": true}
            ])))
            .mount(&server)
            .await;

        let client = GptMakerClient::with_base_url(&server.uri(), "secret");
        let agents = client.get_agents("ws-1").await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "a1");
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/c1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let client = GptMakerClient::with_base_url(&server.uri(), "expired");
        match client.get_chat_messages("c1").await {
            Err(GptMakerError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid token");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workspace/ws-1/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = GptMakerClient::with_base_url(&server.uri(), "secret");
        let err = client.get_agents("ws-1").await.unwrap_err();
        assert!(matches!(err, GptMakerError::Json(_)));
    }
}

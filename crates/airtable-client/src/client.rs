use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, error, warn};

use crate::error::AirtableError;
use crate::types::{AirtableRecord, ListRecordsResponse};

const DEFAULT_BASE_URL: &str = "https://api.airtable.com/v0";
const CACHE_TTL_SECS: u64 = 60;
/// Airtable never returns more than 100 records per page
const PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_PAGES: usize = 50;

/// Airtable client scoped to a single base
pub struct AirtableClient {
    client: reqwest::Client,
    base_url: String,
    base_id: String,
    api_key: String,
    max_pages: usize,
    cache: Cache<String, Arc<Vec<AirtableRecord>>>,
}

impl AirtableClient {
    /// Create a new client for a base on the public API
    pub fn new(base_id: &str, api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, base_id, api_key)
    }

    /// Create a new client against a custom Airtable-compatible URL
    pub fn with_base_url(base_url: &str, base_id: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .support_invalidation_closures()
            .build();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            base_id: base_id.to_string(),
            api_key: api_key.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            cache,
        }
    }

    /// Cap the number of pages read per listing
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// List every record of a table, optionally filtered by an Airtable formula
    pub async fn list_records(
        &self,
        table: &str,
        filter_formula: Option<&str>,
    ) -> crate::Result<Arc<Vec<AirtableRecord>>> {
        let cache_key = format!("{}|{}", table, filter_formula.unwrap_or_default());

        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!(table = %table, "Airtable cache hit");
            return Ok(cached);
        }

        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        for _ in 0..self.max_pages {
            let url = self.list_url(table, filter_formula, offset.as_deref());

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                error!(status = %status, table = %table, "Airtable list failed");
                return Err(AirtableError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: ListRecordsResponse = response.json().await?;
            records.extend(page.records);

            offset = page.offset;
            if offset.is_none() {
                break;
            }
        }

        if offset.is_some() {
            warn!(
                table = %table,
                max_pages = self.max_pages,
                count = records.len(),
                "Airtable listing truncated at page limit"
            );
        }

        debug!(table = %table, count = records.len(), "Fetched Airtable records");

        let records = Arc::new(records);
        self.cache.insert(cache_key, records.clone()).await;
        Ok(records)
    }

    /// Forget cached list results for one table, whatever their filter
    pub fn invalidate_table(&self, table: &str) {
        let prefix = format!("{}|", table);
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            warn!(table = %table, error = %e, "Falling back to clearing the whole cache");
            self.cache.invalidate_all();
        }
    }

    /// Forget every cached list result
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    fn list_url(&self, table: &str, filter_formula: Option<&str>, offset: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}/{}?pageSize={}",
            self.base_url,
            self.base_id,
            urlencoding::encode(table),
            PAGE_SIZE
        );
        if let Some(formula) = filter_formula {
            url.push_str(&format!("&filterByFormula={}", urlencoding::encode(formula)));
        }
        if let Some(offset) = offset {
            url.push_str(&format!("&offset={}", urlencoding::encode(offset)));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(ids: &[&str], offset: Option<&str>) -> ResponseTemplate {
        let records: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "fields": {"Email": format!("{}@example.com", id)}}))
            .collect();
        let mut body = json!({ "records": records });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[test]
    fn test_list_url_plain() {
        let client = AirtableClient::new("appXYZ", "key");
        assert_eq!(
            client.list_url("Users", None, None),
            "https://api.airtable.com/v0/appXYZ/Users?pageSize=100"
        );
    }

    #[test]
    fn test_list_url_with_formula_and_offset() {
        let client = AirtableClient::with_base_url("http://localhost:9000/", "app1", "key");
        let url = client.list_url(
            "Team Users",
            Some("LOWER({Email})='a@b.c'"),
            Some("itr/rec2"),
        );
        assert!(url.starts_with("http://localhost:9000/app1/Team%20Users?pageSize=100"));
        assert!(url.contains("&filterByFormula=LOWER%28%7BEmail%7D%29%3D%27a%40b.c%27"));
        assert!(url.ends_with("&offset=itr%2Frec2"));
    }

    #[tokio::test]
    async fn test_list_records_follows_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app1/Users"))
            .and(query_param("offset", "itr1"))
            .respond_with(page(&["rec3"], None))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app1/Users"))
            .and(header("authorization", "Bearer key"))
            .respond_with(page(&["rec1", "rec2"], Some("itr1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = AirtableClient::with_base_url(&server.uri(), "app1", "key");
        let records = client.list_records("Users", None).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rec1", "rec2", "rec3"]);
    }

    #[tokio::test]
    async fn test_list_records_stops_at_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app1/Users"))
            .respond_with(page(&["rec"], Some("more")))
            .expect(2)
            .mount(&server)
            .await;

        let client =
            AirtableClient::with_base_url(&server.uri(), "app1", "key").with_max_pages(2);
        let records = client.list_records("Users", None).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_list_records_is_cached_until_table_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app1/Users"))
            .respond_with(page(&["rec1"], None))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app1/Plans"))
            .respond_with(page(&["plan1"], None))
            .expect(1)
            .mount(&server)
            .await;

        let client = AirtableClient::with_base_url(&server.uri(), "app1", "key");
        let first = client.list_records("Users", None).await.unwrap();
        let second = client.list_records("Users", None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        client.list_records("Plans", None).await.unwrap();

        client.invalidate_table("Users");
        client.list_records("Users", None).await.unwrap();
        client.list_records("Plans", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422).set_body_string("INVALID_FILTER_BY_FORMULA"))
            .mount(&server)
            .await;

        let client = AirtableClient::with_base_url(&server.uri(), "app1", "key");
        match client.list_records("Users", Some("BAD(")).await {
            Err(AirtableError::Api { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "INVALID_FILTER_BY_FORMULA");
            }
            other => panic!("expected API error, got {:?}", other.map(|r| r.len())),
        }
    }
}

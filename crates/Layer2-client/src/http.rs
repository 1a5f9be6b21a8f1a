//! HTTP implementation of the API traits

use crate::api::{ClientResult, MunicipalityApi, ResearchApi};
use crate::error::ClientError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{
    CreateResearchRequest, Municipality, ReportRecord, ResearchPage, ResearchQuery,
    TaskStatusRecord,
};
use async_trait::async_trait;
use region_foundation::ConsoleConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Research console API client
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a client for `base_url` (scheme + host, no `/api` suffix)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn from_config(config: &ConsoleConfig) -> ClientResult<Self> {
        Self::new(&config.api_base_url, config.request_timeout)
    }

    /// Retry policy for idempotent lookups
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // URLs
    // ========================================================================

    fn research_url(&self) -> String {
        format!("{}/api/research/", self.base_url)
    }

    fn task_url(&self, task_id: &str) -> String {
        format!(
            "{}/api/research/{}",
            self.base_url,
            urlencoding::encode(task_id)
        )
    }

    fn municipalities_url(&self, tail: &str) -> String {
        format!("{}/api/municipalities/{}", self.base_url, tail)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        let response = request.send().await.map_err(ClientError::from_reqwest)?;
        decode(response).await
    }
}

/// Map a non-2xx response to ClientError, otherwise decode JSON
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::from_http_status(status.as_u16(), &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ResearchApi for HttpClient {
    async fn get_status(&self, task_id: &str) -> ClientResult<TaskStatusRecord> {
        let url = self.task_url(task_id);
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn stop(&self, task_id: &str) -> ClientResult<()> {
        let url = format!("{}/stop", self.task_url(task_id));
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_http_status(status.as_u16(), &body))
        }
    }

    async fn get_report(&self, task_id: &str) -> ClientResult<ReportRecord> {
        let url = format!("{}/report", self.task_url(task_id));
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn list(&self, query: &ResearchQuery) -> ClientResult<ResearchPage> {
        let url = self.research_url();
        let pairs = query.to_pairs();
        with_retry(&self.retry, "list research", || {
            debug!("GET {} {:?}", url, pairs);
            self.send_json(self.client.get(&url).query(&pairs))
        })
        .await
    }

    async fn create(&self, request: &CreateResearchRequest) -> ClientResult<TaskStatusRecord> {
        request.validate().map_err(|message| ClientError::InvalidRequest {
            status: 400,
            message,
        })?;

        let url = self.research_url();
        debug!("POST {} region={}", url, request.region_name);
        self.send_json(self.client.post(&url).json(request)).await
    }
}

#[async_trait]
impl MunicipalityApi for HttpClient {
    async fn search(&self, query: &str, limit: u32) -> ClientResult<Vec<Municipality>> {
        let url = self.municipalities_url("search");
        let pairs = [("q", query.to_string()), ("limit", limit.to_string())];
        with_retry(&self.retry, "search municipalities", || {
            debug!("GET {} q={}", url, query);
            self.send_json(self.client.get(&url).query(&pairs))
        })
        .await
    }

    async fn get(&self, id: i64) -> ClientResult<Municipality> {
        let url = self.municipalities_url(&id.to_string());
        with_retry(&self.retry, "get municipality", || {
            self.send_json(self.client.get(&url))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.research_url(), "http://localhost:5000/api/research/");
        assert_eq!(
            client.task_url("region_0201011_ab12"),
            "http://localhost:5000/api/research/region_0201011_ab12"
        );
        assert_eq!(
            client.municipalities_url("search"),
            "http://localhost:5000/api/municipalities/search"
        );
    }

    #[test]
    fn test_task_id_is_path_encoded() {
        let client = client();
        assert_eq!(
            client.task_url("a/b c"),
            "http://localhost:5000/api/research/a%2Fb%20c"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ConsoleConfig::default().with_api_base_url("https://console.example/");
        let client = HttpClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://console.example");
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        // Port 9 (discard) is never contacted: validation fails first.
        let client = HttpClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let err = client
            .create(&CreateResearchRequest::new("", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { status: 400, .. }));
    }
}

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::error::{parse_error_message, SearchApiError};
use crate::payload::SearchResponse;

/// Default base URL of the local search server.
pub const DEFAULT_SEARCH_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    pub base_url: String,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for SearchApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            user_agent: None,
            timeout: None,
        }
    }
}

impl SearchApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Search endpoint for a base URL. Blank input uses [`DEFAULT_SEARCH_BASE_URL`].
pub fn normalize_search_url(base_url: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_SEARCH_BASE_URL
    } else {
        base_url.trim()
    };
    let base = base.trim_end_matches('/');
    let base = base.strip_suffix("/api/search").unwrap_or(base);
    let base = base.strip_suffix("/api").unwrap_or(base);
    format!("{base}/api/search")
}

#[derive(Debug)]
pub struct SearchApiClient {
    http: Client,
    config: SearchApiConfig,
}

impl SearchApiClient {
    pub fn new(config: SearchApiConfig) -> Result<Self, SearchApiError> {
        let trimmed = config.base_url.trim();
        if !trimmed.is_empty() && !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(SearchApiError::InvalidBaseUrl(trimmed.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.user_agent.as_deref() {
            builder = builder.user_agent(user_agent.to_string());
        }
        let http = builder.build().map_err(SearchApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SearchApiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_search_url(&self.config.base_url)
    }

    pub fn build_request(&self, query: &str) -> Result<RequestBuilder, SearchApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchApiError::EmptyQuery);
        }
        Ok(self.http.get(self.endpoint()).query(&[("q", query)]))
    }

    /// Run one search and decode the ordered result list.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchApiError> {
        let builder = self.build_request(query)?;
        tracing::debug!(endpoint = %self.endpoint(), query_chars = query.chars().count(), "sending search request");

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchApiError::Status(status, parse_error_message(status, &body)));
        }

        let decoded: SearchResponse = serde_json::from_str(&body)?;
        tracing::debug!(results = decoded.results.len(), "search completed");
        Ok(decoded)
    }
}

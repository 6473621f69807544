use std::sync::Arc;
use std::time::Duration;

use chat_provider::{ProviderInitError, SearchFailure, SearchHit, SearchProvider};
use search_api::{SearchApiClient, SearchApiConfig, SearchApiError, SearchResponse};

/// Results kept per query; the search server is asked for eight.
pub const DEFAULT_MAX_RESULTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchProviderConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_results: usize,
}

impl Default for WebSearchProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

trait SearchClient: Send + Sync {
    fn search(&self, query: &str) -> Result<SearchResponse, SearchApiError>;
}

struct DefaultSearchClient {
    client: SearchApiClient,
}

impl SearchClient for DefaultSearchClient {
    fn search(&self, query: &str) -> Result<SearchResponse, SearchApiError> {
        crate::block_on(self.client.search(query), SearchApiError::Unknown)
    }
}

/// `SearchProvider` adapter backed by the `search_api` transport.
pub struct WebSearchProvider {
    client: Arc<dyn SearchClient>,
    max_results: usize,
}

impl WebSearchProvider {
    pub fn new(config: WebSearchProviderConfig) -> Result<Self, ProviderInitError> {
        let mut api_config = SearchApiConfig::default();
        if let Some(base_url) = config.base_url {
            api_config.base_url = base_url;
        }
        if let Some(timeout) = config.timeout {
            api_config = api_config.with_timeout(timeout);
        }
        let client = SearchApiClient::new(api_config).map_err(|error| {
            ProviderInitError::new(format!("Failed to initialize web search provider: {error}"))
        })?;

        Ok(Self {
            client: Arc::new(DefaultSearchClient { client }),
            max_results: config.max_results.max(1),
        })
    }
}

impl SearchProvider for WebSearchProvider {
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchFailure> {
        let response = self.client.search(query).map_err(|error| {
            tracing::warn!(error = %error, "web search failed");
            SearchFailure::new(error.to_string())
        })?;

        Ok(response
            .results
            .into_iter()
            .take(self.max_results)
            .map(|result| SearchHit {
                title: result.title,
                snippet: result.body,
                url: result.href.filter(|href| !href.trim().is_empty()),
            })
            .collect())
    }
}

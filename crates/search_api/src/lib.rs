//! Transport-only client for the web search endpoint (`GET /api/search?q=`).

pub mod client;
pub mod error;
pub mod payload;

pub use client::{normalize_search_url, SearchApiClient, SearchApiConfig, DEFAULT_SEARCH_BASE_URL};
pub use error::SearchApiError;
pub use payload::{SearchResponse, SearchResult};

//! Transport-only client for a local Ollama model server.
//!
//! This crate owns request building and response parsing for the non-streaming
//! `/api/chat` endpoint and the `/api/tags` model listing endpoint. It contains
//! no session state and no provider-contract coupling.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod url;

pub use client::OllamaApiClient;
pub use config::OllamaApiConfig;
pub use error::OllamaApiError;
pub use payload::{ChatRequest, ChatResponse, ModelTag, ResponseMessage, TagsResponse, WireMessage};
pub use url::{chat_url, normalize_base_url, tags_url};

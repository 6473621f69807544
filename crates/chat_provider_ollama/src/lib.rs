//! Ollama-backed implementations of the shared `chat_provider` contract.
//!
//! The adapters own a blocking bridge over the async `ollama_api` and
//! `search_api` transports and translate their errors into provider-neutral
//! failure values.

mod chat;
mod search;

pub use chat::{OllamaProvider, OllamaProviderConfig, OLLAMA_PROVIDER_ID};
pub use search::{WebSearchProvider, WebSearchProviderConfig, DEFAULT_MAX_RESULTS};

fn block_on<F, T, E>(future: F, runtime_error: impl FnOnce(String) -> E) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| runtime_error(format!("failed to initialize tokio runtime: {error}")))?;

    runtime.block_on(future)
}

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{ChatProvider, ProviderInitError, SearchProvider};
use chat_provider_mock::{MockChatProvider, MockSearchProvider};
use chat_provider_ollama::{
    OllamaProvider, OllamaProviderConfig, WebSearchProvider, WebSearchProviderConfig,
};

use crate::config::{ProviderKind, Settings};

const USER_AGENT: &str = concat!("olaf/", env!("CARGO_PKG_VERSION"));
const MOCK_LATENCY: Duration = Duration::from_millis(250);

/// Chat and search backends selected for a run.
#[derive(Clone)]
pub struct Providers {
    pub chat: Arc<dyn ChatProvider>,
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl Providers {
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderInitError> {
        match settings.provider {
            ProviderKind::Mock => Ok(Self::mock()),
            ProviderKind::Ollama => {
                let chat = OllamaProvider::new(
                    OllamaProviderConfig::default()
                        .with_base_url(settings.ollama_url.clone())
                        .with_timeout(settings.timeout)
                        .with_user_agent(USER_AGENT),
                )?;
                let search = WebSearchProvider::new(WebSearchProviderConfig {
                    base_url: Some(settings.search_url.clone()),
                    timeout: Some(settings.timeout),
                    ..WebSearchProviderConfig::default()
                })?;

                Ok(Self {
                    chat: Arc::new(chat),
                    search: Some(Arc::new(search)),
                })
            }
        }
    }

    /// Offline backends answering with deterministic echoes.
    #[must_use]
    pub fn mock() -> Self {
        Self {
            chat: Arc::new(MockChatProvider::new().with_delay(MOCK_LATENCY)),
            search: Some(Arc::new(MockSearchProvider::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use olaf::MarkerPolicy;

    use super::*;

    fn settings(provider: ProviderKind, ollama_url: &str) -> Settings {
        Settings {
            config_path: PathBuf::from("config.json"),
            data_dir: PathBuf::from("."),
            ollama_url: ollama_url.to_string(),
            search_url: "http://localhost:5000".to_string(),
            search_enabled: false,
            marker_policy: MarkerPolicy::Exclude,
            timeout: Duration::from_secs(5),
            reveal_chunk_chars: 4,
            reveal_tick: Duration::from_millis(8),
            provider,
            log_level: "warn".to_string(),
            log_file: None,
        }
    }

    #[test]
    fn mock_kind_resolves_mock_backends() {
        let providers = Providers::from_settings(&settings(ProviderKind::Mock, "ignored"))
            .expect("mock providers build");

        assert_eq!(providers.chat.provider_id(), "mock");
        assert!(providers.search.is_some());
    }

    #[test]
    fn ollama_kind_resolves_ollama_backend() {
        let providers =
            Providers::from_settings(&settings(ProviderKind::Ollama, "http://localhost:11434"))
                .expect("ollama providers build");

        assert_eq!(providers.chat.provider_id(), "ollama");
    }

    #[test]
    fn ollama_kind_rejects_unusable_url() {
        let result = Providers::from_settings(&settings(ProviderKind::Ollama, "ftp://models"));

        assert!(result.is_err());
    }
}

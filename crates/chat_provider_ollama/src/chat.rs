use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_provider::{
    ChatProvider, Completion, CompletionFailure, CompletionRequest, ModelInfo, ProviderInitError,
};
use ollama_api::classify::is_transient;
use ollama_api::{
    ChatRequest, ChatResponse, OllamaApiClient, OllamaApiConfig, OllamaApiError, TagsResponse,
    WireMessage,
};

/// Stable provider identifier used by startup selection.
pub const OLLAMA_PROVIDER_ID: &str = "ollama";

/// Runtime configuration for the Ollama provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OllamaProviderConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    pub max_retries: u32,
}

impl OllamaProviderConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn into_api_config(self) -> OllamaApiConfig {
        let mut config = OllamaApiConfig::default().with_max_retries(self.max_retries);
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        config
    }
}

trait ChatClient: Send + Sync {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, OllamaApiError>;
    fn list_models(&self) -> Result<TagsResponse, OllamaApiError>;
}

#[derive(Debug)]
struct DefaultChatClient {
    client: OllamaApiClient,
}

impl ChatClient for DefaultChatClient {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, OllamaApiError> {
        crate::block_on(self.client.chat(request), OllamaApiError::Unknown)
    }

    fn list_models(&self) -> Result<TagsResponse, OllamaApiError> {
        crate::block_on(self.client.list_models(), OllamaApiError::Unknown)
    }
}

/// `ChatProvider` adapter backed by the `ollama_api` transport.
pub struct OllamaProvider {
    client: Arc<dyn ChatClient>,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self, ProviderInitError> {
        let client = OllamaApiClient::new(config.into_api_config()).map_err(|error| {
            ProviderInitError::new(format!("Failed to initialize ollama provider: {error}"))
        })?;

        Ok(Self {
            client: Arc::new(DefaultChatClient { client }),
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

impl ChatProvider for OllamaProvider {
    fn provider_id(&self) -> &str {
        OLLAMA_PROVIDER_ID
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, CompletionFailure> {
        let tags = self.client.list_models().map_err(map_failure)?;

        Ok(tags
            .models
            .iter()
            .map(|tag| ModelInfo {
                name: tag.name.clone(),
                model: tag.identifier().to_string(),
            })
            .collect())
    }

    fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionFailure> {
        let request_id = request.request_id;
        let messages = request
            .messages
            .into_iter()
            .map(|message| WireMessage::new(message.role.as_str(), message.content))
            .collect();
        let payload = ChatRequest::new(request.model, messages);

        let started = Instant::now();
        let response = self.client.chat(&payload).map_err(|error| {
            tracing::warn!(request_id, model = %payload.model, error = %error, "chat request failed");
            map_failure(error)
        })?;
        tracing::info!(
            request_id,
            model = %payload.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            eval_count = ?response.eval_count,
            "chat request completed"
        );

        Ok(Completion::from_reply(
            response.content().map(str::to_string),
            response.eval_count,
            response.eval_duration,
        ))
    }
}

fn map_failure(error: OllamaApiError) -> CompletionFailure {
    let retryable = is_transient(&error);
    let failure = match &error {
        OllamaApiError::Status(status, message) => {
            CompletionFailure::status(format!("HTTP {}: {message}", status.as_u16()))
        }
        OllamaApiError::Decode(decode) => CompletionFailure::decode(decode.to_string()),
        _ => CompletionFailure::transport(error.to_string()),
    };
    failure.with_retryable(retryable)
}

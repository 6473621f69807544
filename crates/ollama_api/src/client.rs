use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::classify::{is_transient, retry_delay};
use crate::config::OllamaApiConfig;
use crate::error::{parse_error_message, OllamaApiError};
use crate::payload::{ChatRequest, ChatResponse, TagsResponse};
use crate::url::{chat_url, tags_url};

#[derive(Debug)]
pub struct OllamaApiClient {
    http: Client,
    config: OllamaApiConfig,
}

impl OllamaApiClient {
    pub fn new(config: OllamaApiConfig) -> Result<Self, OllamaApiError> {
        validate_base_url(&config.base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OllamaApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaApiConfig {
        &self.config
    }

    pub fn chat_endpoint(&self) -> String {
        chat_url(&self.config.base_url)
    }

    pub fn tags_endpoint(&self) -> String {
        tags_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, OllamaApiError> {
        let mut out = HeaderMap::new();
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            out.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    OllamaApiError::InvalidHeader("invalid user agent".to_string())
                })?,
            );
        }
        for (key, value) in &self.config.extra_headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| OllamaApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(value).map_err(|_| {
                    OllamaApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    /// Build the `/api/chat` POST. The body always carries `stream: false`.
    pub fn build_chat_request(&self, request: &ChatRequest) -> Result<RequestBuilder, OllamaApiError> {
        validate_chat_request(request)?;

        let mut payload = request.clone();
        payload.stream = false;
        Ok(self
            .http
            .post(self.chat_endpoint())
            .headers(self.build_headers()?)
            .json(&payload))
    }

    pub fn build_tags_request(&self) -> Result<RequestBuilder, OllamaApiError> {
        Ok(self
            .http
            .get(self.tags_endpoint())
            .headers(self.build_headers()?))
    }

    /// Send one chat request and decode the complete reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, OllamaApiError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            endpoint = %self.chat_endpoint(),
            "sending chat request"
        );
        self.send_json(|| self.build_chat_request(request)).await
    }

    /// Fetch the models the server offers.
    pub async fn list_models(&self) -> Result<TagsResponse, OllamaApiError> {
        tracing::debug!(endpoint = %self.tags_endpoint(), "listing models");
        self.send_json(|| self.build_tags_request()).await
    }

    async fn send_json<T, F>(&self, build: F) -> Result<T, OllamaApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> Result<RequestBuilder, OllamaApiError>,
    {
        let mut attempt = 0;
        loop {
            match self.send_once(build()?).await {
                Err(error) if attempt < self.config.max_retries && is_transient(&error) => {
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient ollama failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, OllamaApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OllamaApiError::Status(status, parse_error_message(status, &body)));
        }

        serde_json::from_str(&body).map_err(OllamaApiError::from)
    }
}

fn validate_base_url(base_url: &str) -> Result<(), OllamaApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(OllamaApiError::InvalidBaseUrl(trimmed.to_string()))
    }
}

fn validate_chat_request(request: &ChatRequest) -> Result<(), OllamaApiError> {
    if request.model.trim().is_empty() {
        return Err(OllamaApiError::InvalidRequest("model is required".to_string()));
    }
    if request.messages.is_empty() {
        return Err(OllamaApiError::InvalidRequest(
            "at least one message is required".to_string(),
        ));
    }
    Ok(())
}

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum OllamaApiError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    InvalidRequest(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Decode(JsonError),
    Unknown(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorValue {
    Text(String),
    Fields { message: Option<String> },
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorValue>,
}

impl ErrorPayload {
    fn message(&self) -> Option<&str> {
        let message = match self.error.as_ref()? {
            ErrorValue::Text(text) => text.as_str(),
            ErrorValue::Fields { message } => message.as_deref()?,
        };
        let message = message.trim();
        (!message.is_empty()).then_some(message)
    }
}

impl fmt::Display for OllamaApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Decode(error) => write!(f, "response decode error: {error}"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for OllamaApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Decode(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OllamaApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for OllamaApiError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error)
    }
}

/// Extract a readable message from an error response body.
///
/// Ollama answers failures with `{"error":"..."}`; the object form
/// `{"error":{"message":"..."}}` is accepted too. Anything else falls back to
/// the raw body, or the status reason when the body is empty.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message() {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum SearchApiError {
    InvalidBaseUrl(String),
    EmptyQuery,
    Request(reqwest::Error),
    Status(StatusCode, String),
    Decode(JsonError),
    Unknown(String),
}

impl fmt::Display for SearchApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid search base URL: {value}"),
            Self::EmptyQuery => write!(f, "search query is empty"),
            Self::Request(error) => write!(f, "search request error: {error}"),
            Self::Status(status, message) => write!(f, "search HTTP {status} {message}"),
            Self::Decode(error) => write!(f, "search response decode error: {error}"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for SearchApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Decode(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SearchApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for SearchApiError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

/// Extract `{"error":"..."}` from a failure body, falling back to the raw body
/// or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = parsed {
        return message;
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

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::OllamaApiError;

/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 500;

fn transient_text_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"(?i)rate.?limit|overloaded|service.?unavailable|connection.?(refused|reset|closed)|timed?.?out|server busy",
        )
        .expect("transient error regex must compile")
    })
}

/// Whether a status/body pair looks like a temporary server condition.
pub fn is_transient_http_error(status: u16, error_text: &str) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504) || transient_text_regex().is_match(error_text)
}

/// Whether a client error is worth retrying or reporting as "try again later".
pub fn is_transient(error: &OllamaApiError) -> bool {
    match error {
        OllamaApiError::Request(error) => {
            error.is_connect() || error.is_timeout() || transient_text_regex().is_match(&error.to_string())
        }
        OllamaApiError::Status(status, message) => is_transient_http_error(status.as_u16(), message),
        OllamaApiError::InvalidBaseUrl(_)
        | OllamaApiError::InvalidHeader(_)
        | OllamaApiError::InvalidRequest(_)
        | OllamaApiError::Decode(_)
        | OllamaApiError::Unknown(_) => false,
    }
}

/// Exponential backoff delay for a retry attempt.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(16);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(exponent)))
}

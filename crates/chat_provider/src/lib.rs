//! Provider-neutral contract for chat completions and web search.
//!
//! This crate defines only the request/response vocabulary shared between the
//! orchestration engine and concrete providers. It excludes transport details,
//! wire payloads, and session bookkeeping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one outbound chat request.
pub type RequestId = u64;

/// Text substituted when the model reply carries no content.
pub const NO_RESPONSE_PLACEHOLDER: &str = "(No response)";

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Error returned when a provider cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Returns the lowercase wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-facing message: role and content only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Input required to request one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub request_id: RequestId,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Generation throughput reported alongside a reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    tokens_per_second: f64,
}

impl Throughput {
    /// Computes throughput from an evaluation count and a duration in nanoseconds.
    ///
    /// Returns `None` unless both values are present and the duration is non-zero,
    /// so callers never display a NaN or infinite rate.
    #[must_use]
    pub fn from_eval(eval_count: Option<u64>, eval_duration_ns: Option<u64>) -> Option<Self> {
        let count = eval_count?;
        let duration_ns = eval_duration_ns.filter(|duration| *duration > 0)?;
        let seconds = duration_ns as f64 / NANOS_PER_SECOND;

        Some(Self {
            tokens_per_second: count as f64 / seconds,
        })
    }

    #[must_use]
    pub fn tokens_per_second(&self) -> f64 {
        self.tokens_per_second
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} tokens/sec", self.tokens_per_second)
    }
}

/// Parsed model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub reply_text: String,
    pub throughput: Option<Throughput>,
}

impl Completion {
    /// Builds a completion from raw reply fields.
    ///
    /// A missing or empty reply becomes [`NO_RESPONSE_PLACEHOLDER`] instead of a failure.
    #[must_use]
    pub fn from_reply(
        content: Option<String>,
        eval_count: Option<u64>,
        eval_duration_ns: Option<u64>,
    ) -> Self {
        let reply_text = content
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string());

        Self {
            reply_text,
            throughput: Throughput::from_eval(eval_count, eval_duration_ns),
        }
    }
}

/// Broad classification of a failed completion or listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, timeout, or other transport breakage.
    Transport,
    /// The server answered with a non-success status.
    Status,
    /// The server answered with a body that could not be decoded.
    Decode,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Status => "status",
            Self::Decode => "decode",
        }
    }
}

/// Failure reported by a chat provider.
///
/// Every failure is recoverable by user action: the caller keeps the pending
/// user turn and lets the user resubmit or pick another model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionFailure {
    pub kind: FailureKind,
    pub message: String,
    /// The condition looks temporary; resubmitting the same prompt may work.
    pub retryable: bool,
}

impl CompletionFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
        }
    }

    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Status, message)
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, message)
    }
}

impl fmt::Display for CompletionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for CompletionFailure {}

/// A model offered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Display name.
    pub name: String,
    /// Identifier sent in completion requests.
    pub model: String,
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
}

/// Failure reported by a search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    message: String,
}

impl SearchFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SearchFailure {}

impl From<String> for SearchFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SearchFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Provider interface for model listing and non-streaming completions.
///
/// Calls block the current thread; hosts run them off the event loop.
pub trait ChatProvider: Send + Sync + 'static {
    /// Stable identifier used for startup selection and logging.
    fn provider_id(&self) -> &str;

    /// Lists models the server offers, in server order.
    fn list_models(&self) -> Result<Vec<ModelInfo>, CompletionFailure>;

    /// Sends the full message sequence and returns the parsed reply.
    fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionFailure>;
}

/// Provider interface for free-text web search.
pub trait SearchProvider: Send + Sync + 'static {
    /// Returns ordered results for `query`.
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchFailure>;
}

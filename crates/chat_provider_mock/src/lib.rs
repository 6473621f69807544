//! Deterministic mock implementations of the shared `chat_provider` contract.
//!
//! This crate contains no transport logic and is intended for offline runs and
//! engine-level integration testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_provider::{
    ChatProvider, Completion, CompletionFailure, CompletionRequest, ModelInfo, Role, SearchFailure,
    SearchHit, SearchProvider,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

type CompletionOutcome = Result<Completion, CompletionFailure>;
type SearchOutcome = Result<Vec<SearchHit>, SearchFailure>;

/// Scripted chat provider that records every request it receives.
///
/// Scripted outcomes are consumed in order; once exhausted, the provider
/// answers with a deterministic echo of the final user message.
#[derive(Debug)]
pub struct MockChatProvider {
    models: Result<Vec<ModelInfo>, CompletionFailure>,
    script: Mutex<VecDeque<CompletionOutcome>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockChatProvider {
    /// Creates a provider offering `mock` and `mock-alt` with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::with_models(vec!["mock".to_string(), "mock-alt".to_string()])
    }

    /// Creates a provider offering the given model identifiers.
    #[must_use]
    pub fn with_models(model_ids: Vec<String>) -> Self {
        let models = model_ids
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|model| ModelInfo {
                name: model.clone(),
                model,
            })
            .collect();

        Self {
            models: Ok(models),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Makes `list_models` fail with `failure`.
    #[must_use]
    pub fn with_listing_failure(mut self, failure: CompletionFailure) -> Self {
        self.models = Err(failure);
        self
    }

    /// Sleeps before answering each completion, to mimic model latency.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a successful reply.
    pub fn push_reply(&self, completion: Completion) {
        lock_unpoisoned(&self.script).push_back(Ok(completion));
    }

    /// Queues a failed reply.
    pub fn push_failure(&self, failure: CompletionFailure) {
        lock_unpoisoned(&self.script).push_back(Err(failure));
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    fn echo(request: &CompletionRequest) -> Completion {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let reply = format!("Mock reply from {}: {prompt}", request.model);
        let eval_count = reply.split_whitespace().count() as u64;

        Completion::from_reply(Some(reply), Some(eval_count), Some(1_000_000_000))
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatProvider for MockChatProvider {
    fn provider_id(&self) -> &str {
        MOCK_PROVIDER_ID
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, CompletionFailure> {
        self.models.clone()
    }

    fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionFailure> {
        lock_unpoisoned(&self.requests).push(request.clone());

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        match lock_unpoisoned(&self.script).pop_front() {
            Some(outcome) => outcome,
            None => Ok(Self::echo(&request)),
        }
    }
}

/// Scripted search provider that records every query it receives.
///
/// Once the script is exhausted, each query yields one canned hit naming it.
#[derive(Debug, Default)]
pub struct MockSearchProvider {
    script: Mutex<VecDeque<SearchOutcome>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_hits(&self, hits: Vec<SearchHit>) {
        lock_unpoisoned(&self.script).push_back(Ok(hits));
    }

    pub fn push_failure(&self, failure: SearchFailure) {
        lock_unpoisoned(&self.script).push_back(Err(failure));
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        lock_unpoisoned(&self.queries).clone()
    }
}

impl SearchProvider for MockSearchProvider {
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchFailure> {
        lock_unpoisoned(&self.queries).push(query.to_string());

        match lock_unpoisoned(&self.script).pop_front() {
            Some(outcome) => outcome,
            None => Ok(vec![SearchHit {
                title: format!("Result for {query}"),
                snippet: format!("Mock snippet about {query}."),
                url: Some("https://example.com/mock".to_string()),
            }]),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use chat_provider::{ChatMessage, FailureKind};

    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            request_id: 7,
            model: "mock".to_string(),
            messages: vec![
                ChatMessage::new(Role::System, "context"),
                ChatMessage::new(Role::User, prompt),
            ],
        }
    }

    #[test]
    fn lists_configured_models_and_skips_blank_ids() {
        let provider = MockChatProvider::with_models(vec![
            "llama3:8b".to_string(),
            "  ".to_string(),
            "mistral:7b".to_string(),
        ]);

        let models = provider.list_models().expect("listing succeeds");
        let ids: Vec<&str> = models.iter().map(|model| model.model.as_str()).collect();

        assert_eq!(provider.provider_id(), MOCK_PROVIDER_ID);
        assert_eq!(ids, vec!["llama3:8b", "mistral:7b"]);
    }

    #[test]
    fn listing_failure_is_reported() {
        let provider = MockChatProvider::new()
            .with_listing_failure(CompletionFailure::transport("connection refused"));

        let failure = provider.list_models().expect_err("listing fails");
        assert_eq!(failure.kind, FailureKind::Transport);
    }

    #[test]
    fn scripted_outcomes_are_consumed_in_order_then_echo() {
        let provider = MockChatProvider::new();
        provider.push_reply(Completion::from_reply(Some("first".to_string()), None, None));
        provider.push_failure(CompletionFailure::status("model not found"));

        assert_eq!(
            provider.complete(request("a")).expect("scripted reply").reply_text,
            "first"
        );
        assert!(provider.complete(request("b")).is_err());
        assert_eq!(
            provider.complete(request("c")).expect("echo reply").reply_text,
            "Mock reply from mock: c"
        );
        assert_eq!(provider.requests().len(), 3);
        assert_eq!(provider.requests()[1].messages[1].content, "b");
    }

    #[test]
    fn echo_reply_reports_throughput() {
        let provider = MockChatProvider::new();
        let completion = provider.complete(request("hello")).expect("echo reply");

        assert!(completion.throughput.is_some());
    }

    #[test]
    fn search_records_queries_and_replays_script() {
        let provider = MockSearchProvider::new();
        provider.push_failure(SearchFailure::new("rate limited"));

        assert!(provider.search("first").is_err());
        let hits = provider.search("second").expect("canned hit");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Result for second");
        assert_eq!(provider.queries(), vec!["first".to_string(), "second".to_string()]);
    }
}

//! Blocking work for one submission: augmentation, then completion.
//!
//! Runs off the event loop. Results are reported as [`TurnEvent`]s tagged
//! with the request id; the engine decides whether they still apply.

use chat_provider::{
    ChatProvider, Completion, CompletionFailure, CompletionRequest, RequestId, SearchProvider,
};
use tracing::debug;

use crate::augment::{augment, AugmentOutcome, AugmentationConfig};
use crate::keys::SessionId;
use crate::turn::Turn;

/// Everything a worker needs to serve one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnJob {
    pub request_id: RequestId,
    pub session_id: SessionId,
    pub model: String,
    /// Outbound turns, already filtered by the marker policy, ending with the new user turn.
    pub turns: Vec<Turn>,
    pub latest_user_text: String,
    pub augmentation: AugmentationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Search context was injected; `marker` belongs in the visible transcript.
    Augmented { request_id: RequestId, marker: Turn },
    /// Search failed and the request went out unaugmented.
    AugmentationFailed { request_id: RequestId, message: String },
    Completed { request_id: RequestId, completion: Completion },
    Failed { request_id: RequestId, failure: CompletionFailure },
}

impl TurnEvent {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Augmented { request_id, .. }
            | Self::AugmentationFailed { request_id, .. }
            | Self::Completed { request_id, .. }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

/// Runs augmentation and the completion call for `job`, emitting events in order.
///
/// Exactly one terminal event (`Completed` or `Failed`) is emitted last.
pub fn run_turn(
    job: TurnJob,
    chat: &dyn ChatProvider,
    search: Option<&dyn SearchProvider>,
    emit: &mut dyn FnMut(TurnEvent),
) {
    let request_id = job.request_id;
    let augmented = augment(&job.augmentation, &job.turns, &job.latest_user_text, search);

    if let Some(marker) = augmented.marker() {
        emit(TurnEvent::Augmented { request_id, marker });
    }
    if let AugmentOutcome::Failed { failure, .. } = &augmented.outcome {
        emit(TurnEvent::AugmentationFailed {
            request_id,
            message: failure.message().to_string(),
        });
    }

    let request = CompletionRequest {
        request_id,
        model: job.model,
        messages: augmented.final_turns.iter().map(Turn::to_message).collect(),
    };
    debug!(
        request_id,
        session = %job.session_id,
        messages = request.messages.len(),
        provider = chat.provider_id(),
        "dispatching completion"
    );

    match chat.complete(request) {
        Ok(completion) => emit(TurnEvent::Completed {
            request_id,
            completion,
        }),
        Err(failure) => emit(TurnEvent::Failed {
            request_id,
            failure,
        }),
    }
}

#[cfg(test)]
mod tests {
    use chat_provider::{ChatMessage, Role, SearchFailure};
    use chat_provider_mock::{MockChatProvider, MockSearchProvider};

    use super::*;
    use crate::augment::MarkerPolicy;

    fn job(enabled: bool) -> TurnJob {
        TurnJob {
            request_id: 11,
            session_id: SessionId::from_millis(1),
            model: "mock".to_string(),
            turns: vec![Turn::user("hello")],
            latest_user_text: "hello".to_string(),
            augmentation: AugmentationConfig {
                enabled,
                marker_policy: MarkerPolicy::Exclude,
            },
        }
    }

    fn collect(job: TurnJob, chat: &MockChatProvider, search: &MockSearchProvider) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        run_turn(job, chat, Some(search), &mut |event| events.push(event));
        events
    }

    #[test]
    fn plain_submission_emits_single_completion() {
        let chat = MockChatProvider::new();
        let search = MockSearchProvider::new();

        let events = collect(job(false), &chat, &search);

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TurnEvent::Completed { request_id: 11, .. }));
        assert_eq!(
            chat.requests()[0].messages,
            vec![ChatMessage::new(Role::User, "hello")]
        );
    }

    #[test]
    fn augmented_submission_emits_marker_before_completion() {
        let chat = MockChatProvider::new();
        let search = MockSearchProvider::new();

        let events = collect(job(true), &chat, &search);

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            TurnEvent::Augmented {
                request_id: 11,
                marker: Turn::search_marker("hello"),
            }
        );
        assert!(matches!(events[1], TurnEvent::Completed { .. }));
        assert_eq!(chat.requests()[0].messages.len(), 3);
    }

    #[test]
    fn search_failure_still_completes_with_unaugmented_turns() {
        let chat = MockChatProvider::new();
        let search = MockSearchProvider::new();
        search.push_failure(SearchFailure::new("connection refused"));

        let events = collect(job(true), &chat, &search);

        assert_eq!(
            events[0],
            TurnEvent::AugmentationFailed {
                request_id: 11,
                message: "connection refused".to_string(),
            }
        );
        assert!(matches!(events[1], TurnEvent::Completed { .. }));
        assert_eq!(
            chat.requests()[0].messages,
            vec![ChatMessage::new(Role::User, "hello")]
        );
    }

    #[test]
    fn completion_failure_is_terminal_event() {
        let chat = MockChatProvider::new();
        chat.push_failure(CompletionFailure::transport("connection refused"));
        let search = MockSearchProvider::new();

        let events = collect(job(false), &chat, &search);

        assert!(matches!(
            &events[..],
            [TurnEvent::Failed { request_id: 11, failure }] if failure.message == "connection refused"
        ));
        assert_eq!(events[0].request_id(), 11);
    }
}

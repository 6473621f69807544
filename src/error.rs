use session_store::SessionStoreError;
use thiserror::Error;

use crate::keys::SessionId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("enter a prompt before sending")]
    EmptyPrompt,

    #[error("select a model before sending")]
    NoModelSelected,

    #[error("a reply is still pending for this session")]
    RequestPending,

    #[error("model '{0}' is not offered by the server")]
    UnknownModel(String),

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("storage error: {0}")]
    Storage(#[from] SessionStoreError),

    #[error("failed to encode transcript for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Validation failures are reported to the user and leave state untouched.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPrompt
                | Self::NoModelSelected
                | Self::RequestPending
                | Self::UnknownModel(_)
        )
    }
}

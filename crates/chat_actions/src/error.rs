use chat_transcript::TranscriptError;
use console_api::ConsoleApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    /// A precondition did not hold. Returned before the transcript is touched.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("operation aborted")]
    Aborted,

    #[error("transport failed: {0}")]
    Transport(#[source] ConsoleApiError),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl ActionError {
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<ConsoleApiError> for ActionError {
    fn from(error: ConsoleApiError) -> Self {
        if error.is_cancelled() {
            Self::Aborted
        } else {
            Self::Transport(error)
        }
    }
}

impl From<TranscriptError> for ActionError {
    fn from(error: TranscriptError) -> Self {
        Self::InvalidState(error.to_string())
    }
}

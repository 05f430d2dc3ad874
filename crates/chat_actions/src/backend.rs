//! Seams between the action controller and the outside world.

use chat_history::ChatHistoryStore;
use chat_transcript::Conversation;
use console_api::{ByteStream, CancelHandle, ConsoleApiError, ExecuteRequest, RunCodeRequest};
use futures_util::future::BoxFuture;

pub type StreamFuture<'a> = BoxFuture<'a, Result<ByteStream, ConsoleApiError>>;

/// Streaming calls the controller issues.
///
/// Implementations observe `cancel` while opening the stream; the controller
/// observes it on every chunk read afterwards.
pub trait ChatBackend: Send + Sync + 'static {
    fn execute_code<'a>(
        &'a self,
        request: RunCodeRequest,
        cancel: &'a CancelHandle,
    ) -> StreamFuture<'a>;

    fn generate<'a>(&'a self, request: ExecuteRequest, cancel: &'a CancelHandle)
        -> StreamFuture<'a>;
}

/// Saves and loads whole conversations.
pub trait ChatPersistence: Send + Sync + 'static {
    fn save_chat(&self, chat: &Conversation) -> Result<(), String>;

    /// Loads `chat_id`, or an empty conversation when nothing is stored.
    fn load_chat(&self, chat_id: &str) -> Result<Conversation, String>;
}

impl ChatPersistence for ChatHistoryStore {
    fn save_chat(&self, chat: &Conversation) -> Result<(), String> {
        self.save(chat).map(|_| ()).map_err(|error| error.to_string())
    }

    fn load_chat(&self, chat_id: &str) -> Result<Conversation, String> {
        self.load_or_empty(chat_id).map_err(|error| error.to_string())
    }
}

/// Follow-up analysis started after a plain assistant turn.
///
/// `start` must not block; the analysis runs on its own and is cancelled
/// through `abort`.
pub trait AnalysisAgent: Send + Sync + 'static {
    fn start(&self, chat: Conversation);
    fn is_running(&self) -> bool;
    fn abort(&self);
}

/// Analysis collaborator for setups without an analysis service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalysis;

impl AnalysisAgent for NoAnalysis {
    fn start(&self, chat: Conversation) {
        tracing::debug!(chat_id = %chat.id, "analysis skipped");
    }

    fn is_running(&self) -> bool {
        false
    }

    fn abort(&self) {}
}

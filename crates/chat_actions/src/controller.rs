use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chat_transcript::{Conversation, MessageGroup, TranscriptStore};
use console_api::{
    next_chunk, CancelHandle, ExecuteRequest, RunCodeRequest, StreamEvent, TokenSplitter,
    Utf8ChunkDecoder,
};
use tokio::sync::Mutex as OperationLock;

use crate::backend::{AnalysisAgent, ChatBackend, ChatPersistence};
use crate::decoder::TurnDecoder;
use crate::error::ActionError;
use crate::lock_unpoisoned;

pub const GUIDE_ME_PROMPT: &str =
    "I'm stuck at using AIConsole, can you suggest what can I do from this point in the conversation?";

/// Agent assigned to a new assistant turn when no earlier assistant group exists.
pub const DEFAULT_AGENT_ID: &str = "assistant";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionState {
    #[default]
    Idle,
    Running,
    Generating,
}

impl ActionState {
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Run,
    Generate,
}

#[derive(Debug, Default)]
struct ActiveOperation {
    state: ActionState,
    cancel: Option<CancelHandle>,
}

/// Drives code execution and assistant turn generation for one open chat.
///
/// Operations are serialized: `run`, `generate` and the commands built on
/// them wait for the in-flight operation to finish or be aborted. A finished
/// code run chains into a generated turn, and a generated turn ending in
/// code chains into another run while "always execute code" is on, all
/// inside the call that started the chain.
pub struct ActionController {
    store: Arc<Mutex<TranscriptStore>>,
    backend: Arc<dyn ChatBackend>,
    persistence: Arc<dyn ChatPersistence>,
    analysis: Arc<dyn AnalysisAgent>,
    always_execute_code: AtomicBool,
    active: Mutex<ActiveOperation>,
    operation_lock: OperationLock<()>,
}

impl ActionController {
    pub fn new(
        store: Arc<Mutex<TranscriptStore>>,
        backend: Arc<dyn ChatBackend>,
        persistence: Arc<dyn ChatPersistence>,
        analysis: Arc<dyn AnalysisAgent>,
    ) -> Self {
        Self {
            store,
            backend,
            persistence,
            analysis,
            always_execute_code: AtomicBool::new(false),
            active: Mutex::new(ActiveOperation::default()),
            operation_lock: OperationLock::new(()),
        }
    }

    pub fn with_always_execute_code(self, enabled: bool) -> Self {
        self.set_always_execute_code(enabled);
        self
    }

    pub fn set_always_execute_code(&self, enabled: bool) {
        self.always_execute_code.store(enabled, Ordering::SeqCst);
    }

    pub fn always_execute_code(&self) -> bool {
        self.always_execute_code.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> Arc<Mutex<TranscriptStore>> {
        Arc::clone(&self.store)
    }

    /// Copy of the current conversation.
    pub fn snapshot(&self) -> Conversation {
        lock_unpoisoned(&self.store).chat().clone()
    }

    pub fn state(&self) -> ActionState {
        lock_unpoisoned(&self.active).state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    pub fn is_working(&self) -> bool {
        self.is_busy() || self.analysis.is_running()
    }

    pub fn is_last_group_from_user(&self) -> bool {
        lock_unpoisoned(&self.store).is_last_group_from_user()
    }

    /// Executes the last message, which must be a code message, streaming
    /// its output into a new output record.
    pub async fn run(&self) -> Result<(), ActionError> {
        let _serial = self.operation_lock.lock().await;
        self.drive(Step::Run).await
    }

    /// Streams the next assistant turn into the last group.
    pub async fn generate(&self) -> Result<(), ActionError> {
        let _serial = self.operation_lock.lock().await;
        self.drive(Step::Generate).await
    }

    /// Aborts the in-flight operation and any running analysis.
    pub fn stop_work(&self) {
        let cancel = lock_unpoisoned(&self.active).cancel.clone();
        if let Some(cancel) = cancel {
            if !cancel.is_aborted() {
                tracing::info!("stop requested");
            }
            cancel.abort();
        }
        self.analysis.abort();
    }

    /// Appends a user turn with `text` and an empty assistant turn, then
    /// generates the reply.
    pub async fn submit_command(&self, text: &str) -> Result<(), ActionError> {
        if text.trim().is_empty() {
            return Err(ActionError::InvalidState(
                "command text must not be blank".to_string(),
            ));
        }

        let _serial = self.operation_lock.lock().await;
        {
            let mut store = lock_unpoisoned(&self.store);
            let materials_ids = store
                .last_group()
                .map(|group| group.materials_ids.clone())
                .unwrap_or_default();
            let agent_id = store
                .chat()
                .message_groups
                .iter()
                .rev()
                .find(|group| !group.is_from_user())
                .map(|group| group.agent_id.clone())
                .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string());

            store.append_group(MessageGroup::user(text, materials_ids.clone()));
            store.append_group(MessageGroup::assistant(agent_id, None, materials_ids));
        }

        self.drive(Step::Generate).await
    }

    /// Asks the assistant for suggestions on how to continue.
    pub async fn guide_me(&self) -> Result<(), ActionError> {
        if self.is_working() {
            return Err(ActionError::InvalidState(
                "cannot ask for guidance while work is in progress".to_string(),
            ));
        }
        if self.is_last_group_from_user() {
            return Err(ActionError::InvalidState(
                "the last turn is already from the user".to_string(),
            ));
        }

        self.submit_command(GUIDE_ME_PROMPT).await
    }

    /// Stops current work and loads `chat_id` into the store.
    pub async fn open_chat(&self, chat_id: &str) -> Result<(), ActionError> {
        self.stop_work();
        let _serial = self.operation_lock.lock().await;

        lock_unpoisoned(&self.store).set_loading(true);
        let loaded = self.persistence.load_chat(chat_id);

        let mut store = lock_unpoisoned(&self.store);
        store.set_loading(false);
        match loaded {
            Ok(chat) => {
                tracing::info!(
                    chat_id,
                    groups = chat.message_groups.len(),
                    "chat opened"
                );
                store.replace(chat);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(chat_id, %error, "failed to load chat");
                Err(ActionError::Persistence(error))
            }
        }
    }

    /// Stops current work, waits for it to settle, and discards the chat.
    pub async fn close_chat(&self) {
        self.stop_work();
        let _serial = self.operation_lock.lock().await;
        lock_unpoisoned(&self.store).discard();
    }

    /// Runs `first` and every step it chains into under one cancel handle,
    /// so a stop between steps still ends the chain.
    async fn drive(&self, first: Step) -> Result<(), ActionError> {
        let cancel = CancelHandle::new();
        let outcome = self.drive_steps(first, &cancel).await;
        self.finish();
        outcome
    }

    async fn drive_steps(&self, first: Step, cancel: &CancelHandle) -> Result<(), ActionError> {
        let mut next = Some(first);
        while let Some(step) = next {
            next = match step {
                Step::Run => self.run_step(cancel).await?,
                Step::Generate => self.generate_step(cancel).await?,
            };
        }
        Ok(())
    }

    async fn run_step(&self, cancel: &CancelHandle) -> Result<Option<Step>, ActionError> {
        let (request, follow_up) = {
            let store = lock_unpoisoned(&self.store);
            let (group, code) = store.last_code_message()?;
            let request = RunCodeRequest {
                chat_id: store.chat_id().to_string(),
                language: code.language,
                code: code.content.clone(),
                materials_ids: group.materials_ids.clone(),
            };
            let follow_up = MessageGroup::assistant(
                group.agent_id.clone(),
                group.task.clone(),
                group.materials_ids.clone(),
            );
            (request, follow_up)
        };

        self.begin(ActionState::Running, cancel);
        tracing::info!(
            chat_id = %request.chat_id,
            language = %request.language,
            "running code"
        );
        let outcome = self.stream_code_output(request, cancel).await;

        match outcome {
            Ok(()) => {
                self.persist().await?;
                if cancel.is_aborted() {
                    tracing::info!("operation aborted before follow-up turn");
                    return Ok(None);
                }
                lock_unpoisoned(&self.store).append_group(follow_up);
                Ok(Some(Step::Generate))
            }
            Err(error) => self.settle_interrupted(error).await,
        }
    }

    async fn generate_step(&self, cancel: &CancelHandle) -> Result<Option<Step>, ActionError> {
        let request = {
            let store = lock_unpoisoned(&self.store);
            let group = store.last_group()?;
            ExecuteRequest {
                chat: store.chat().clone(),
                relevant_materials_ids: group.materials_ids.clone(),
                agent_id: group.agent_id.clone(),
            }
        };

        self.begin(ActionState::Generating, cancel);
        tracing::info!(
            chat_id = %request.chat.id,
            agent_id = %request.agent_id,
            "generating assistant turn"
        );
        let outcome = self.stream_turn(request, cancel).await;

        match outcome {
            Ok(()) => {
                self.drop_trailing_empty_message();
                self.persist().await?;
                if cancel.is_aborted() {
                    tracing::info!("operation aborted after turn");
                    return Ok(None);
                }
                Ok(self.next_after_turn())
            }
            Err(error) => self.settle_interrupted(error).await,
        }
    }

    async fn stream_code_output(
        &self,
        request: RunCodeRequest,
        cancel: &CancelHandle,
    ) -> Result<(), ActionError> {
        let mut stream = self.backend.execute_code(request, cancel).await?;
        lock_unpoisoned(&self.store).append_empty_output()?;

        let mut decoder = Utf8ChunkDecoder::default();
        let mut bytes = 0usize;
        let read = loop {
            match next_chunk(&mut stream, Some(cancel)).await {
                Ok(Some(chunk)) => {
                    bytes += chunk.len();
                    self.append_output(&decoder.decode(&chunk))?;
                }
                Ok(None) => break Ok(()),
                Err(error) => break Err(ActionError::from(error)),
            }
        };

        self.append_output(&decoder.finish())?;
        tracing::debug!(bytes, "code output stream ended");
        read
    }

    async fn stream_turn(
        &self,
        request: ExecuteRequest,
        cancel: &CancelHandle,
    ) -> Result<(), ActionError> {
        let mut stream = self.backend.generate(request, cancel).await?;
        let mut splitter = TokenSplitter::default();
        let mut decoder = TurnDecoder::new();
        let mut bytes = 0usize;

        loop {
            match next_chunk(&mut stream, Some(cancel)).await {
                Ok(Some(chunk)) => {
                    bytes += chunk.len();
                    self.apply_events(&mut decoder, splitter.feed(&chunk))?;
                }
                Ok(None) => break,
                Err(error) => {
                    // Text held back as a possible token start is still output.
                    if let Err(flush_error) = self.apply_events(&mut decoder, splitter.finish()) {
                        tracing::debug!(error = %flush_error, "dropped held-back stream text");
                    }
                    return Err(error.into());
                }
            }
        }

        self.apply_events(&mut decoder, splitter.finish())?;
        tracing::debug!(bytes, "turn stream ended");
        Ok(())
    }

    fn apply_events(
        &self,
        decoder: &mut TurnDecoder,
        events: Vec<StreamEvent>,
    ) -> Result<(), ActionError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut store = lock_unpoisoned(&self.store);
        decoder.apply_all(&mut store, events)
    }

    fn append_output(&self, text: &str) -> Result<(), ActionError> {
        if text.is_empty() {
            return Ok(());
        }
        lock_unpoisoned(&self.store).append_output_text(text)?;
        Ok(())
    }

    fn drop_trailing_empty_message(&self) {
        let mut store = lock_unpoisoned(&self.store);
        let is_empty = store
            .last_message()
            .is_ok_and(|location| location.message.content().is_empty());
        if !is_empty {
            return;
        }
        if let Ok(message) = store.remove_last_message() {
            tracing::debug!(message_id = %message.id(), "dropped empty trailing message");
        }
    }

    fn next_after_turn(&self) -> Option<Step> {
        let snapshot = {
            let store = lock_unpoisoned(&self.store);
            let location = store.last_message().ok()?;
            if location.message.is_code() {
                return self.always_execute_code().then_some(Step::Run);
            }
            store.chat().clone()
        };

        tracing::debug!(chat_id = %snapshot.id, "starting analysis");
        self.analysis.start(snapshot);
        None
    }

    async fn settle_interrupted(&self, error: ActionError) -> Result<Option<Step>, ActionError> {
        let _ = self.persist().await;
        if error.is_abort() {
            tracing::info!("operation aborted");
            Ok(None)
        } else {
            tracing::warn!(%error, "operation failed");
            Err(error)
        }
    }

    /// Saves a snapshot on the blocking pool. The busy state is left as is.
    async fn persist(&self) -> Result<(), ActionError> {
        let snapshot = self.snapshot();
        let chat_id = snapshot.id.clone();
        let persistence = Arc::clone(&self.persistence);
        let saved = tokio::task::spawn_blocking(move || persistence.save_chat(&snapshot))
            .await
            .unwrap_or_else(|error| Err(format!("save task failed: {error}")));

        saved.map_err(|error| {
            tracing::warn!(%chat_id, %error, "failed to save chat");
            ActionError::Persistence(error)
        })
    }

    fn begin(&self, state: ActionState, cancel: &CancelHandle) {
        let mut active = lock_unpoisoned(&self.active);
        active.state = state;
        active.cancel = Some(cancel.clone());
    }

    fn finish(&self) {
        *lock_unpoisoned(&self.active) = ActiveOperation::default();
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chat_actions::backends::ScriptedBackend;
use chat_actions::{ActionController, AnalysisAgent, ChatPersistence};
use chat_transcript::{CodeLanguage, Conversation, Message, MessageGroup, TranscriptStore};

#[derive(Default)]
pub struct RecordingPersistence {
    saved: Mutex<Vec<Conversation>>,
    stored: Mutex<Option<Conversation>>,
    fail_saves: AtomicBool,
    save_delay: Mutex<Option<Duration>>,
}

impl RecordingPersistence {
    pub fn with_stored(chat: Conversation) -> Self {
        let persistence = Self::default();
        *lock_unpoisoned(&persistence.stored) = Some(chat);
        persistence
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Blocks every save for `delay` after recording it.
    pub fn slow_saves(&self, delay: Duration) {
        *lock_unpoisoned(&self.save_delay) = Some(delay);
    }

    /// Polls until at least `count` saves have started.
    pub async fn wait_for_saves(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.save_count() < count {
            assert!(Instant::now() < deadline, "save was never attempted");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn saves(&self) -> Vec<Conversation> {
        lock_unpoisoned(&self.saved).clone()
    }

    pub fn save_count(&self) -> usize {
        lock_unpoisoned(&self.saved).len()
    }
}

impl ChatPersistence for RecordingPersistence {
    fn save_chat(&self, chat: &Conversation) -> Result<(), String> {
        lock_unpoisoned(&self.saved).push(chat.clone());
        let delay = *lock_unpoisoned(&self.save_delay);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        Ok(())
    }

    fn load_chat(&self, chat_id: &str) -> Result<Conversation, String> {
        Ok(lock_unpoisoned(&self.stored)
            .clone()
            .filter(|chat| chat.id == chat_id)
            .unwrap_or_else(|| Conversation::new(chat_id)))
    }
}

#[derive(Default)]
pub struct RecordingAnalysis {
    started: Mutex<Vec<Conversation>>,
    running: AtomicBool,
    aborts: AtomicUsize,
}

impl RecordingAnalysis {
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        lock_unpoisoned(&self.started).len()
    }

    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl AnalysisAgent for RecordingAnalysis {
    fn start(&self, chat: Conversation) {
        lock_unpoisoned(&self.started).push(chat);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub controller: Arc<ActionController>,
    pub backend: Arc<ScriptedBackend>,
    pub persistence: Arc<RecordingPersistence>,
    pub analysis: Arc<RecordingAnalysis>,
}

impl Harness {
    pub fn new(backend: ScriptedBackend, store: TranscriptStore) -> Self {
        Self::with_persistence(backend, store, RecordingPersistence::default())
    }

    pub fn with_persistence(
        backend: ScriptedBackend,
        store: TranscriptStore,
        persistence: RecordingPersistence,
    ) -> Self {
        let backend = Arc::new(backend);
        let persistence = Arc::new(persistence);
        let analysis = Arc::new(RecordingAnalysis::default());
        let controller = Arc::new(ActionController::new(
            Arc::new(Mutex::new(store)),
            backend.clone(),
            persistence.clone(),
            analysis.clone(),
        ));

        Self {
            controller,
            backend,
            persistence,
            analysis,
        }
    }

    pub fn chat(&self) -> Conversation {
        self.controller.snapshot()
    }

    pub fn last_group_messages(&self) -> Vec<Message> {
        self.chat()
            .message_groups
            .last()
            .map(|group| group.messages.clone())
            .unwrap_or_default()
    }

    /// Polls the transcript until `predicate` holds.
    pub async fn wait_for(&self, predicate: impl Fn(&Conversation) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !predicate(&self.chat()) {
            assert!(Instant::now() < deadline, "transcript never reached expected state");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Conversation with a user request and an empty assistant turn.
pub fn store_awaiting_turn() -> TranscriptStore {
    let mut store = TranscriptStore::empty("chat-1");
    store.append_group(MessageGroup::user("list files", vec!["mat-1".to_string()]));
    store.append_group(MessageGroup::assistant(
        "coder",
        Some("list files".to_string()),
        vec!["mat-1".to_string()],
    ));
    store
}

/// Conversation whose last message is a code message.
pub fn store_with_code(language: CodeLanguage, code: &str) -> TranscriptStore {
    let mut store = store_awaiting_turn();
    store
        .append_message(Message::plain("Let me check."))
        .expect("append plain");
    store
        .append_message(Message::code(language, code))
        .expect("append code");
    store
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use console_api::{ByteStream, CancelHandle, ConsoleApiError, ExecuteRequest, RunCodeRequest};
use futures_util::stream::{self, StreamExt};

use crate::backend::{ChatBackend, StreamFuture};
use crate::lock_unpoisoned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Chunk(Vec<u8>),
    Delay(Duration),
    /// Ends the stream with a transport error.
    Fail(String),
    /// Never yields again; only cancellation ends the read.
    Stall,
}

impl ScriptStep {
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::Chunk(text.as_ref().as_bytes().to_vec())
    }
}

/// Record of one streaming call issued against a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ExecuteCode(RunCodeRequest),
    Generate(ExecuteRequest),
}

/// In-memory backend replaying queued scripts in call order.
///
/// Code-execution calls and turn-generation calls have separate queues. A
/// call with nothing queued fails the way a refused connection would.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    code_scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    turn_scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    const TURN_DELAY_MS: u64 = 150;
    const CHUNK_DELAY_MS: u64 = 40;

    /// Short canned exchange: a turn that proposes a shell command, its
    /// output, and a closing turn.
    pub fn demo() -> Self {
        let chunk_delay = Duration::from_millis(Self::CHUNK_DELAY_MS);
        let paced = |chunks: &[&str]| {
            let mut steps = vec![ScriptStep::Delay(Duration::from_millis(Self::TURN_DELAY_MS))];
            for chunk in chunks {
                steps.push(ScriptStep::text(chunk));
                steps.push(ScriptStep::Delay(chunk_delay));
            }
            steps
        };

        Self::new()
            .with_turn(paced(&[
                "Let me look at the ",
                "project directory.\n",
                "<<<< START CODE (shell) >>>>",
                "ls -la",
                "<<<< END CODE >>>>",
            ]))
            .with_code_output(paced(&["total 8\n", "-rw-r--r--  1 user  staff  42 notes.md\n"]))
            .with_turn(paced(&["The directory holds a single ", "file, `notes.md`."]))
    }

    pub fn with_turn(self, steps: Vec<ScriptStep>) -> Self {
        self.push_turn(steps);
        self
    }

    pub fn with_code_output(self, steps: Vec<ScriptStep>) -> Self {
        self.push_code_output(steps);
        self
    }

    pub fn push_turn(&self, steps: Vec<ScriptStep>) {
        lock_unpoisoned(&self.turn_scripts).push_back(steps);
    }

    pub fn push_code_output(&self, steps: Vec<ScriptStep>) {
        lock_unpoisoned(&self.code_scripts).push_back(steps);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock_unpoisoned(&self.calls).clone()
    }

    fn open(
        &self,
        call: BackendCall,
        cancel: &CancelHandle,
    ) -> Result<ByteStream, ConsoleApiError> {
        if cancel.is_aborted() {
            return Err(ConsoleApiError::Cancelled);
        }

        let (queue, kind) = match &call {
            BackendCall::ExecuteCode(_) => (&self.code_scripts, "code execution"),
            BackendCall::Generate(_) => (&self.turn_scripts, "turn generation"),
        };
        lock_unpoisoned(&self.calls).push(call);

        let steps = lock_unpoisoned(queue).pop_front().ok_or_else(|| {
            ConsoleApiError::Unknown(format!("no scripted response queued for {kind}"))
        })?;
        Ok(script_stream(steps))
    }
}

impl ChatBackend for ScriptedBackend {
    fn execute_code<'a>(
        &'a self,
        request: RunCodeRequest,
        cancel: &'a CancelHandle,
    ) -> StreamFuture<'a> {
        let opened = self.open(BackendCall::ExecuteCode(request), cancel);
        Box::pin(async move { opened })
    }

    fn generate<'a>(
        &'a self,
        request: ExecuteRequest,
        cancel: &'a CancelHandle,
    ) -> StreamFuture<'a> {
        let opened = self.open(BackendCall::Generate(request), cancel);
        Box::pin(async move { opened })
    }
}

fn script_stream(steps: Vec<ScriptStep>) -> ByteStream {
    stream::unfold(steps.into_iter(), |mut steps| async move {
        loop {
            let Some(step) = steps.next() else {
                return None;
            };
            match step {
                ScriptStep::Chunk(bytes) => return Some((Ok(bytes), steps)),
                ScriptStep::Delay(delay) => tokio::time::sleep(delay).await,
                ScriptStep::Fail(message) => {
                    return Some((Err(ConsoleApiError::Unknown(message)), steps));
                }
                ScriptStep::Stall => std::future::pending::<()>().await,
            }
        }
    })
    .boxed()
}

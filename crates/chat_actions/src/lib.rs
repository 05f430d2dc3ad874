//! Chat action core: code execution, assistant turn generation, and the
//! stream protocol that turns backend bytes into transcript edits.
//!
//! ## Backend bootstrap
//!
//! The `aiconsole-chat` binary selects its backend with `AICONSOLE_BACKEND`:
//!
//! - `AICONSOLE_BACKEND=http` (default) talks to an AIConsole server
//! - `AICONSOLE_BACKEND=scripted` replays a canned exchange for local testing
//!
//! Settings come from the JSON file named by `AICONSOLE_CONFIG_PATH`; see
//! [`settings::ClientSettings`] for its shape.
//!
//! ## Turn protocol
//!
//! A generated turn is plain text with embedded control tokens. Text outside
//! code blocks becomes plain messages, `<<<< START CODE (LANG) >>>>` opens a
//! code message closed by `<<<< END CODE >>>>`, and `<<<< CLEAR >>>>` drops
//! the message written so far. [`decoder::TurnDecoder`] enforces the token
//! order; [`controller::ActionController`] owns the operation lifecycle.

use std::sync::{Mutex, MutexGuard};

pub mod backend;
pub mod backends;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod settings;

pub use backend::{AnalysisAgent, ChatBackend, ChatPersistence, NoAnalysis};
pub use controller::{ActionController, ActionState, DEFAULT_AGENT_ID, GUIDE_ME_PROMPT};
pub use decoder::TurnDecoder;
pub use error::ActionError;
pub use settings::ClientSettings;

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

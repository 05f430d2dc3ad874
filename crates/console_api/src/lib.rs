//! Transport-only AIConsole backend client primitives.
//!
//! This crate owns request building, streaming response reads, cooperative
//! cancellation, and lexical splitting of the assistant's token-delimited
//! stream protocol. It contains no transcript mutation and no chat state.
//!
//! The assistant stream embeds bit-exact control tokens in plain text:
//! `<<<< START CODE (LANG) >>>>`, `<<<< END CODE >>>>`, and `<<<< CLEAR >>>>`.
//! [`TokenSplitter`] turns raw byte chunks into [`StreamEvent`]s and buffers
//! partial tokens and partial UTF-8 sequences across chunk boundaries.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod tokens;
pub mod url;
pub mod utf8;

pub use cancel::{await_or_cancel, next_chunk, CancelHandle};
pub use client::{ByteStream, ConsoleApiClient};
pub use config::ConsoleApiConfig;
pub use error::ConsoleApiError;
pub use payload::{ExecuteRequest, RunCodeRequest};
pub use retry::RetryPolicy;
pub use tokens::{StreamEvent, TokenSplitter};
pub use url::normalize_base_url;
pub use utf8::Utf8ChunkDecoder;

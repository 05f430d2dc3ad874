use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use crate::client::ByteStream;
use crate::error::ConsoleApiError;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cooperative cancellation handle for one in-flight operation.
///
/// Clones share state. Once aborted a handle never becomes active again;
/// aborting twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    aborted: Arc<AtomicBool>,
}

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

fn is_cancelled(cancel: Option<&CancelHandle>) -> bool {
    cancel.is_some_and(CancelHandle::is_aborted)
}

/// Awaits `future`, returning [`ConsoleApiError::Cancelled`] as soon as the
/// handle is observed aborted.
pub async fn await_or_cancel<F>(
    future: F,
    cancel: Option<&CancelHandle>,
) -> Result<F::Output, ConsoleApiError>
where
    F: Future,
{
    if cancel.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancel) {
            return Err(ConsoleApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancel) {
                return Err(ConsoleApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

/// Reads the next chunk of `stream`, observing cancellation.
///
/// Returns `Ok(None)` at end of stream.
pub async fn next_chunk(
    stream: &mut ByteStream,
    cancel: Option<&CancelHandle>,
) -> Result<Option<Vec<u8>>, ConsoleApiError> {
    match await_or_cancel(stream.next(), cancel).await? {
        Some(chunk) => chunk.map(Some),
        None => Ok(None),
    }
}

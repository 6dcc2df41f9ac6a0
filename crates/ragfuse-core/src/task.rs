//! Deadline and cancellation helpers shared by collectors.
//!
//! Async work is dropped when the deadline or the caller's token fires, which
//! also kills subprocesses spawned with `kill_on_drop`. Blocking work cannot be
//! dropped; it receives a child token and is expected to poll it between units
//! of work so an abandoned call stops soon after the deadline.

use std::future::Future;
use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub async fn with_deadline<T, F>(
    label: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        outcome = tokio::time::timeout(timeout, work) => match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(label.to_string(), timeout)),
        },
        () = cancel.cancelled() => Err(Error::Cancelled(label.to_string())),
    }
}

pub async fn run_blocking<T, F>(
    label: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(CancellationToken) -> Result<T> + Send + 'static,
{
    let token = cancel.child_token();
    let worker_token = token.clone();
    let handle = tokio::task::spawn_blocking(move || work(worker_token));
    tokio::select! {
        joined = handle => joined.map_err(|e| Error::Operation(format!("{label} worker panicked: {e}")))?,
        () = tokio::time::sleep(timeout) => {
            token.cancel();
            Err(Error::Timeout(label.to_string(), timeout))
        }
        () = cancel.cancelled() => {
            token.cancel();
            Err(Error::Cancelled(label.to_string()))
        }
    }
}

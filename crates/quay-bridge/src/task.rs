//! Deferred completion of blocking native work
//!
//! A call that returns a deferred result suspends the caller's logical
//! continuation without ever blocking the event-loop thread: the work runs
//! on a dedicated native thread and settles the promoted deferred by
//! scheduling a completion dispatch back onto the loop.

use crate::dispatch::RemoteResolver;
use crate::error::ThreadError;
use quay_core::{ErrorEnvelope, MarshalValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Handle for a spawned blocking task.
pub struct TaskHandle {
    handle: Option<thread::JoinHandle<()>>,
}

impl TaskHandle {
    /// Wait for the task thread to finish. Completion itself is delivered
    /// through the deferred, not through this call.
    pub fn join(mut self) -> Result<(), ThreadError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ThreadError::Join),
            None => Ok(()),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run blocking work on a dedicated native thread and settle the deferred
/// with its outcome.
///
/// If the runtime is torn down before the work finishes, the completion
/// dispatch is dropped; the work itself still runs to completion.
pub fn spawn_blocking<F>(work: F, resolver: RemoteResolver) -> Result<TaskHandle, ThreadError>
where
    F: FnOnce() -> Result<MarshalValue, ErrorEnvelope> + Send + 'static,
{
    let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    let handle = thread::Builder::new()
        .name(format!("quay-task-{}", id))
        .spawn(move || {
            let result = work();
            let _ = resolver.complete(result);
        })
        .map_err(|e| ThreadError::Spawn(e.to_string()))?;
    Ok(TaskHandle {
        handle: Some(handle),
    })
}

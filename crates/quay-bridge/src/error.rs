//! Error types for the bridge

use quay_core::ErrorEnvelope;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, CallError>;

/// Scheduling onto the event loop failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The dispatch pump is gone; the runtime has been torn down
    #[error("Runtime already torn down")]
    Disconnected,
}

/// Worker thread lifecycle errors.
///
/// These return synchronously to the caller of `send`/`spawn`; failures
/// inside the worker's own loop travel through the callback channel only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadError {
    /// `send` on a worker that is shutting down or terminated
    #[error("Worker is not running (state: {0})")]
    NotRunning(&'static str),

    /// The OS refused to spawn the worker thread
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),

    /// The worker thread panicked before it could be joined
    #[error("Worker thread panicked")]
    Join,
}

/// Call dispatch errors on the export surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// No function registered under this name
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    /// No class registered under this name
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    /// No such method on the class
    #[error("Unknown method '{0}.{1}'")]
    UnknownMethod(String, String),

    /// Instance state does not belong to the class the method expects
    #[error("Instance does not belong to class '{0}'")]
    InstanceMismatch(String),

    /// Wrong number of arguments
    #[error("Arity mismatch: expected {expected}, got {got}")]
    Arity {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// A single-use callback was invoked a second time
    #[error("Single-use callback already consumed")]
    Consumed,
}

impl From<CallError> for ErrorEnvelope {
    fn from(e: CallError) -> Self {
        ErrorEnvelope::Plain(e.to_string())
    }
}

//! Quay bridge — callback/thread bridge between native code and a
//! single-threaded scripting runtime
//!
//! This crate provides:
//! - the runtime seam traits (`Callable`, `DeferredResult`)
//! - callback registration with capabilities and signatures
//! - the schedule-only dispatch queue for cross-thread use
//! - native worker threads with a lifecycle protocol and callback channel
//! - deferred completion of blocking work
//! - the export surface (free functions, classes, instance methods)
//!
//! The scripting runtime itself is an external collaborator: runtime glue
//! implements the seam traits and drains the dispatch pump from its event
//! loop.

#![warn(rust_2018_idioms)]

pub mod callback;
pub mod dispatch;
pub mod error;
pub mod module;
pub mod runtime;
pub mod task;
pub mod worker;

pub use callback::{CallableHandle, Capability, Signature};
pub use dispatch::{channel, DispatchPump, RemoteCallback, RemoteResolver, ScheduleToken};
pub use error::{BridgeResult, CallError, ScheduleError, ThreadError};
pub use module::{BridgeModule, CallOutcome, ClassBinding, InstanceHandle};
pub use runtime::{Callable, DeferredResult};
pub use task::{spawn_blocking, TaskHandle};
pub use worker::{Step, WorkerHandle, WorkerLoop, WorkerState};

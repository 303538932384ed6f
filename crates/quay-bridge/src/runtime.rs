//! Runtime seam traits
//!
//! The bridge never touches the scripting runtime's internals. The runtime
//! glue implements these traits; everything else in this crate programs
//! against them. Neither trait requires `Send`: runtime memory belongs to
//! the event-loop thread, and the only off-loop path to it is the dispatch
//! queue.

use quay_core::{ErrorEnvelope, MarshalValue};

/// A callable owned by the scripting runtime.
///
/// Invocation is loop-thread-only. The implementor converts the marshaled
/// arguments into runtime values, runs the runtime callable, and marshals
/// the result back. Dropping the implementor releases the underlying
/// runtime reference.
pub trait Callable {
    /// Invoke the runtime callable with marshaled arguments
    fn invoke(&self, args: &[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope>;
}

impl<F> Callable for F
where
    F: Fn(&[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope>,
{
    fn invoke(&self, args: &[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> {
        self(args)
    }
}

/// A deferred result owned by the scripting runtime.
///
/// The runtime hands one of these to the bridge when a call returns a
/// deferred value. Exactly one of `resolve`/`reject` is called, on the
/// event-loop thread, consuming the deferred. The payload of a rejection
/// is the error-like object produced by the error translator.
pub trait DeferredResult {
    /// Settle the deferred with a success value
    fn resolve(self: Box<Self>, value: MarshalValue);

    /// Settle the deferred with an error payload
    fn reject(self: Box<Self>, error: MarshalValue);
}

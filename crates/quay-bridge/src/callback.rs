//! Callback registration and invocation
//!
//! A [`CallableHandle`] pairs a runtime callable with a capability tag and
//! a declared signature. The handle is owned by whichever native struct or
//! call frame registered it; dropping the handle drops the boxed callable
//! and with it the runtime reference. Handles are loop-thread-only until
//! promoted through the dispatch pump.

use crate::error::CallError;
use crate::runtime::Callable;
use quay_core::{decode, ErrorEnvelope, MarshalValue, Shape};
use std::cell::Cell;

/// Invocation capability of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Consumed by its first invocation; a second invocation is an error
    SingleUse,

    /// May be invoked any number of times. Sequential invocations from the
    /// same owner observe each other's native-side state mutations.
    Reentrant,
}

/// Declared parameter shapes of a callback or exported call.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    params: Vec<Shape>,
}

impl Signature {
    /// Declare a signature from parameter shapes
    pub fn new(params: Vec<Shape>) -> Self {
        Self { params }
    }

    /// A signature taking no arguments
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Declared arity
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Validate an argument list: checks arity, then validates and
    /// canonicalizes each argument against its declared shape.
    pub fn check(&self, args: &[MarshalValue]) -> Result<Vec<MarshalValue>, ErrorEnvelope> {
        if args.len() != self.params.len() {
            return Err(CallError::Arity {
                expected: self.params.len(),
                got: args.len(),
            }
            .into());
        }
        let mut canonical = Vec::with_capacity(args.len());
        for (arg, shape) in args.iter().zip(&self.params) {
            canonical.push(decode(arg, shape)?);
        }
        Ok(canonical)
    }
}

/// An owned reference to a runtime callable, invokable from native code.
pub struct CallableHandle {
    callable: Box<dyn Callable>,
    capability: Capability,
    signature: Signature,
    consumed: Cell<bool>,
}

impl CallableHandle {
    /// Register a runtime callable under a capability and signature.
    pub fn register(
        callable: Box<dyn Callable>,
        capability: Capability,
        signature: Signature,
    ) -> Self {
        Self {
            callable,
            capability,
            signature,
            consumed: Cell::new(false),
        }
    }

    /// Register a plain closure as the callable.
    pub fn from_fn<F>(callable: F, capability: Capability, signature: Signature) -> Self
    where
        F: Fn(&[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> + 'static,
    {
        Self::register(Box::new(callable), capability, signature)
    }

    /// The handle's capability
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// The handle's declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke the callback with marshaled arguments.
    ///
    /// Arguments are validated against the signature and canonicalized
    /// (absent options fold to null) before the runtime callable runs.
    /// A `SingleUse` handle is consumed by its first invocation.
    pub fn invoke(&self, args: &[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> {
        if self.capability == Capability::SingleUse && self.consumed.replace(true) {
            return Err(CallError::Consumed.into());
        }
        let canonical = self.signature.check(args)?;
        self.callable.invoke(&canonical)
    }
}

impl std::fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableHandle")
            .field("capability", &self.capability)
            .field("arity", &self.signature.arity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_handle(
        capability: Capability,
        signature: Signature,
    ) -> (CallableHandle, Rc<RefCell<Vec<Vec<MarshalValue>>>>) {
        let log: Rc<RefCell<Vec<Vec<MarshalValue>>>> = Rc::new(RefCell::new(Vec::new()));
        let inner = log.clone();
        let handle = CallableHandle::from_fn(
            move |args: &[MarshalValue]| {
                inner.borrow_mut().push(args.to_vec());
                Ok(MarshalValue::Null)
            },
            capability,
            signature,
        );
        (handle, log)
    }

    #[test]
    fn test_invoke_checks_arity() {
        let (handle, _log) =
            recording_handle(Capability::Reentrant, Signature::new(vec![Shape::Integer]));
        let err = handle.invoke(&[]).unwrap_err();
        assert_eq!(
            err,
            ErrorEnvelope::Plain("Arity mismatch: expected 1, got 0".to_string())
        );
    }

    #[test]
    fn test_invoke_canonicalizes_option_arguments() {
        let (handle, log) = recording_handle(
            Capability::Reentrant,
            Signature::new(vec![
                Shape::option(Shape::Integer),
                Shape::option(Shape::Integer),
            ]),
        );
        handle
            .invoke(&[MarshalValue::Undefined, MarshalValue::int(666)])
            .unwrap();
        assert_eq!(
            log.borrow()[0],
            vec![MarshalValue::Null, MarshalValue::int(666)]
        );
    }

    #[test]
    fn test_reentrant_invocations_observe_prior_state() {
        let counter = Rc::new(Cell::new(0i64));
        let inner = counter.clone();
        let handle = CallableHandle::from_fn(
            move |_args: &[MarshalValue]| {
                inner.set(inner.get() + 1);
                Ok(MarshalValue::int(inner.get()))
            },
            Capability::Reentrant,
            Signature::empty(),
        );
        for expected in 1..=5 {
            let result = handle.invoke(&[]).unwrap();
            assert_eq!(result, MarshalValue::int(expected));
        }
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_single_use_is_consumed() {
        let (handle, log) = recording_handle(Capability::SingleUse, Signature::empty());
        assert!(handle.invoke(&[]).is_ok());
        let err = handle.invoke(&[]).unwrap_err();
        assert_eq!(err, ErrorEnvelope::from(CallError::Consumed));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_callback_errors_become_envelopes() {
        let handle = CallableHandle::from_fn(
            |_args: &[MarshalValue]| {
                Err(ErrorEnvelope::structured(666, "test"))
            },
            Capability::Reentrant,
            Signature::empty(),
        );
        assert_eq!(
            handle.invoke(&[]).unwrap_err(),
            ErrorEnvelope::structured(666, "test")
        );
    }
}

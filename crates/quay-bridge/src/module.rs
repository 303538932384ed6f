//! Export surface: what the runtime can call
//!
//! A [`BridgeModule`] registers free functions and classes by name. Every
//! call site carries a declared signature and a fixed error policy: the
//! signature validates and canonicalizes arguments before native logic
//! runs, the policy decides whether a failure is thrown or returned.
//!
//! Instance state lives in [`InstanceHandle`]s owned by the runtime glue;
//! there is no module-wide instance table.

use crate::callback::Signature;
use crate::error::{BridgeResult, CallError};
use quay_core::{translate, ErrorEnvelope, ErrorPolicy, MarshalValue, Translated};
use rustc_hash::FxHashMap;
use std::any::Any;

/// Outcome of an exported call, ready for delivery to the runtime.
#[derive(Debug, PartialEq)]
pub enum CallOutcome {
    /// Success value
    Value(MarshalValue),
    /// Failure, already translated under the call site's policy
    Failed(Translated),
}

type FunctionFn = Box<dyn Fn(&[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> + Send + Sync>;
type ConstructorFn =
    Box<dyn Fn(&[MarshalValue]) -> Result<Box<dyn Any + Send>, ErrorEnvelope> + Send + Sync>;
type MethodFn =
    Box<dyn Fn(&mut dyn Any, &[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> + Send + Sync>;

struct FunctionBinding {
    signature: Signature,
    policy: ErrorPolicy,
    func: FunctionFn,
}

struct MethodBinding {
    signature: Signature,
    policy: ErrorPolicy,
    func: MethodFn,
}

/// A class exposed to the runtime: a constructor plus instance methods.
pub struct ClassBinding {
    ctor_signature: Signature,
    constructor: ConstructorFn,
    methods: FxHashMap<String, MethodBinding>,
}

impl ClassBinding {
    /// Declare a class with a typed constructor.
    pub fn new<T, F>(ctor_signature: Signature, constructor: F) -> Self
    where
        T: Any + Send,
        F: Fn(&[MarshalValue]) -> Result<T, ErrorEnvelope> + Send + Sync + 'static,
    {
        Self {
            ctor_signature,
            constructor: Box::new(move |args| {
                constructor(args).map(|state| Box::new(state) as Box<dyn Any + Send>)
            }),
            methods: FxHashMap::default(),
        }
    }

    /// Add an instance method operating on the class's state.
    pub fn method<T, F>(
        mut self,
        name: impl Into<String>,
        signature: Signature,
        policy: ErrorPolicy,
        func: F,
    ) -> Self
    where
        T: Any + Send,
        F: Fn(&mut T, &[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let wrapped: MethodFn = Box::new(move |state, args| {
            let state = state
                .downcast_mut::<T>()
                .ok_or_else(|| ErrorEnvelope::from("instance state has the wrong type"))?;
            func(state, args)
        });
        self.methods.insert(
            name,
            MethodBinding {
                signature,
                policy,
                func: wrapped,
            },
        );
        self
    }
}

/// An instance constructed through the bridge.
///
/// Owned by the runtime glue that requested construction; dropping it
/// releases the native state. Method calls borrow the state mutably, so
/// sequential calls on one instance observe each other's mutations.
pub struct InstanceHandle {
    class: String,
    state: Box<dyn Any + Send>,
}

impl InstanceHandle {
    /// The class this instance belongs to
    pub fn class(&self) -> &str {
        &self.class
    }
}

/// A named set of callable entities exposed to the runtime.
pub struct BridgeModule {
    name: String,
    functions: FxHashMap<String, FunctionBinding>,
    classes: FxHashMap<String, ClassBinding>,
}

impl BridgeModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: FxHashMap::default(),
            classes: FxHashMap::default(),
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a free function with its signature and error policy.
    pub fn register_function<F>(
        &mut self,
        name: impl Into<String>,
        signature: Signature,
        policy: ErrorPolicy,
        func: F,
    ) where
        F: Fn(&[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.into(),
            FunctionBinding {
                signature,
                policy,
                func: Box::new(func),
            },
        );
    }

    /// Register a class.
    pub fn register_class(&mut self, name: impl Into<String>, class: ClassBinding) {
        self.classes.insert(name.into(), class);
    }

    /// Registered function names (sorted for stable listings)
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call a free function.
    ///
    /// Argument validation failures and native failures both flow through
    /// the call site's policy. An unknown name is a binding error, not a
    /// marshaling failure.
    pub fn call_function(
        &self,
        name: &str,
        args: &[MarshalValue],
    ) -> BridgeResult<CallOutcome> {
        let binding = self
            .functions
            .get(name)
            .ok_or_else(|| CallError::UnknownFunction(name.to_string()))?;
        Ok(run_call(
            &binding.signature,
            binding.policy,
            args,
            |canonical| (binding.func)(canonical),
        ))
    }

    /// Construct an instance of a registered class.
    ///
    /// Construction failures are always delivered as thrown errors; there
    /// is no instance to hang a suppressed value on.
    pub fn construct(
        &self,
        class: &str,
        args: &[MarshalValue],
    ) -> BridgeResult<Result<InstanceHandle, Translated>> {
        let binding = self
            .classes
            .get(class)
            .ok_or_else(|| CallError::UnknownClass(class.to_string()))?;
        let canonical = match binding.ctor_signature.check(args) {
            Ok(canonical) => canonical,
            Err(envelope) => return Ok(Err(translate(&envelope, ErrorPolicy::Throwing))),
        };
        match (binding.constructor)(&canonical) {
            Ok(state) => Ok(Ok(InstanceHandle {
                class: class.to_string(),
                state,
            })),
            Err(envelope) => Ok(Err(translate(&envelope, ErrorPolicy::Throwing))),
        }
    }

    /// Call a method on an instance.
    pub fn call_method(
        &self,
        instance: &mut InstanceHandle,
        method: &str,
        args: &[MarshalValue],
    ) -> BridgeResult<CallOutcome> {
        let class = self
            .classes
            .get(&instance.class)
            .ok_or_else(|| CallError::UnknownClass(instance.class.clone()))?;
        let binding = class.methods.get(method).ok_or_else(|| {
            CallError::UnknownMethod(instance.class.clone(), method.to_string())
        })?;
        let state = instance.state.as_mut();
        Ok(run_call(
            &binding.signature,
            binding.policy,
            args,
            |canonical| (binding.func)(state, canonical),
        ))
    }
}

fn run_call<F>(
    signature: &Signature,
    policy: ErrorPolicy,
    args: &[MarshalValue],
    call: F,
) -> CallOutcome
where
    F: FnOnce(&[MarshalValue]) -> Result<MarshalValue, ErrorEnvelope>,
{
    let canonical = match signature.check(args) {
        Ok(canonical) => canonical,
        Err(envelope) => return CallOutcome::Failed(translate(&envelope, policy)),
    };
    match call(&canonical) {
        Ok(value) => CallOutcome::Value(value),
        Err(envelope) => CallOutcome::Failed(translate(&envelope, policy)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_core::Shape;

    fn module_with_types() -> BridgeModule {
        let mut module = BridgeModule::new("binding");
        module.register_function(
            "typesC",
            Signature::new(vec![
                Shape::option(Shape::Integer),
                Shape::option(Shape::Integer),
            ]),
            ErrorPolicy::Throwing,
            |args| Ok(MarshalValue::Array(args.to_vec())),
        );
        module
    }

    #[test]
    fn test_option_round_trip_scenario() {
        let module = module_with_types();
        let cases = [
            (
                vec![MarshalValue::Null, MarshalValue::Null],
                vec![MarshalValue::Null, MarshalValue::Null],
            ),
            (
                vec![MarshalValue::Null, MarshalValue::int(1)],
                vec![MarshalValue::Null, MarshalValue::int(1)],
            ),
            (
                vec![MarshalValue::int(1), MarshalValue::int(1)],
                vec![MarshalValue::int(1), MarshalValue::int(1)],
            ),
            // Explicit undefined decodes exactly like null
            (
                vec![MarshalValue::Undefined, MarshalValue::int(1)],
                vec![MarshalValue::Null, MarshalValue::int(1)],
            ),
        ];
        for (args, expected) in cases {
            let outcome = module.call_function("typesC", &args).unwrap();
            assert_eq!(outcome, CallOutcome::Value(MarshalValue::Array(expected)));
        }
    }

    #[test]
    fn test_unknown_function_is_a_binding_error() {
        let module = module_with_types();
        assert_eq!(
            module.call_function("missing", &[]).unwrap_err(),
            CallError::UnknownFunction("missing".to_string())
        );
    }

    #[test]
    fn test_policy_split_on_same_failure() {
        let mut module = BridgeModule::new("binding");
        let fail = |_args: &[MarshalValue]| -> Result<MarshalValue, ErrorEnvelope> {
            Err(ErrorEnvelope::structured(666, "test"))
        };
        module.register_function(
            "testOfException",
            Signature::empty(),
            ErrorPolicy::Throwing,
            fail,
        );
        module.register_function(
            "testOfExceptionSuppression",
            Signature::empty(),
            ErrorPolicy::Suppressing,
            fail,
        );

        let thrown = module.call_function("testOfException", &[]).unwrap();
        let returned = module
            .call_function("testOfExceptionSuppression", &[])
            .unwrap();
        match (thrown, returned) {
            (
                CallOutcome::Failed(Translated::Thrown(a)),
                CallOutcome::Failed(Translated::Returned(b)),
            ) => assert_eq!(a, b),
            other => panic!("unexpected outcomes: {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure_follows_call_site_policy() {
        let mut module = BridgeModule::new("binding");
        module.register_function(
            "strict",
            Signature::new(vec![Shape::Integer]),
            ErrorPolicy::Suppressing,
            |_args| Ok(MarshalValue::Null),
        );
        let outcome = module
            .call_function("strict", &[MarshalValue::from("nope")])
            .unwrap();
        match outcome {
            CallOutcome::Failed(Translated::Returned(payload)) => {
                assert!(quay_core::is_error_payload(&payload));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    struct Counter {
        value: i64,
    }

    fn counter_class() -> ClassBinding {
        ClassBinding::new(Signature::new(vec![Shape::Integer]), |args| {
            Ok(Counter {
                value: args[0].as_number().unwrap_or(0.0) as i64,
            })
        })
        .method::<Counter, _>(
            "increment",
            Signature::new(vec![Shape::Integer]),
            ErrorPolicy::Throwing,
            |counter, args| {
                counter.value += args[0].as_number().unwrap_or(0.0) as i64;
                Ok(MarshalValue::int(counter.value))
            },
        )
        .method::<Counter, _>(
            "value",
            Signature::empty(),
            ErrorPolicy::Throwing,
            |counter, _args| Ok(MarshalValue::int(counter.value)),
        )
    }

    #[test]
    fn test_construct_and_call_methods() {
        let mut module = BridgeModule::new("binding");
        module.register_class("Counter", counter_class());

        let mut instance = module
            .construct("Counter", &[MarshalValue::int(10)])
            .unwrap()
            .unwrap_or_else(|_| panic!("construction failed"));
        assert_eq!(instance.class(), "Counter");

        // Sequential method calls observe prior mutations
        let outcome = module
            .call_method(&mut instance, "increment", &[MarshalValue::int(5)])
            .unwrap();
        assert_eq!(outcome, CallOutcome::Value(MarshalValue::int(15)));
        let outcome = module
            .call_method(&mut instance, "value", &[])
            .unwrap();
        assert_eq!(outcome, CallOutcome::Value(MarshalValue::int(15)));
    }

    #[test]
    fn test_unknown_method() {
        let mut module = BridgeModule::new("binding");
        module.register_class("Counter", counter_class());
        let mut instance = module
            .construct("Counter", &[MarshalValue::int(0)])
            .unwrap()
            .unwrap_or_else(|_| panic!("construction failed"));
        assert_eq!(
            module
                .call_method(&mut instance, "missing", &[])
                .unwrap_err(),
            CallError::UnknownMethod("Counter".to_string(), "missing".to_string())
        );
    }
}

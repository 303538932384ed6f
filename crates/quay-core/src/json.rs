//! serde_json interop
//!
//! Payloads declared as JSON-typed cross the bridge whole and meet native
//! serde-based code on the other side. Conversion is lossless for every
//! JSON-expressible value; the two non-JSON wire shapes map down:
//! `Undefined` to JSON null, `Variant` to a single-key object.

use crate::value::MarshalValue;
use rustc_hash::FxHashMap;
use serde_json::{Map, Number, Value};

/// Convert a wire value into a `serde_json::Value`.
///
/// Non-finite numbers have no JSON representation and become null, as they
/// do when the runtime serializes them.
pub fn to_json(value: &MarshalValue) -> Value {
    match value {
        MarshalValue::Null | MarshalValue::Undefined => Value::Null,
        MarshalValue::Bool(b) => Value::Bool(*b),
        MarshalValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        MarshalValue::String(s) => Value::String(s.clone()),
        MarshalValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        MarshalValue::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), to_json(v));
            }
            Value::Object(out)
        }
        MarshalValue::Variant { tag, payload } => {
            let inner = match payload {
                Some(p) => to_json(p),
                None => Value::Null,
            };
            let mut out = Map::with_capacity(1);
            out.insert(tag.clone(), inner);
            Value::Object(out)
        }
    }
}

/// Convert a `serde_json::Value` into a wire value.
pub fn from_json(value: &Value) -> MarshalValue {
    match value {
        Value::Null => MarshalValue::Null,
        Value::Bool(b) => MarshalValue::Bool(*b),
        Value::Number(n) => MarshalValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => MarshalValue::String(s.clone()),
        Value::Array(items) => MarshalValue::Array(items.iter().map(from_json).collect()),
        Value::Object(map) => {
            let mut out = FxHashMap::default();
            for (k, v) in map {
                out.insert(k.clone(), from_json(v));
            }
            MarshalValue::Object(out)
        }
    }
}

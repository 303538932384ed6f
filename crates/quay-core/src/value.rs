//! MarshalValue — the canonical wire value shared by both sides of the bridge
//!
//! Every value that crosses the boundary between native code and the
//! scripting runtime is one of these shapes exactly. The encode path only
//! ever produces `Null`, `Bool`, `Number`, `String`, `Array`, `Object`, and
//! `Variant`; absent optionals render as `Null`, never as `Undefined`.
//! `Undefined` exists for the decode path only: it is how the boundary
//! represents the runtime's "absent" value (a missing property, an explicit
//! undefined argument) before the codec folds it into "no value".

use rustc_hash::FxHashMap;
use std::fmt;

/// Canonical wire value.
///
/// Integers and floats share the single `Number` representation, following
/// the runtime's numeric model. `Object` keys are unique; their order is
/// insignificant. `Variant` is the wire shape of a tagged union: one tag
/// plus an optional payload.
#[derive(Debug, Clone)]
pub enum MarshalValue {
    /// Null / "no value" on the encode path
    Null,

    /// Boolean
    Bool(bool),

    /// Numeric value (integer or float, single wire representation)
    Number(f64),

    /// String
    String(String),

    /// Ordered list; element order is preserved in both directions
    Array(Vec<MarshalValue>),

    /// String-keyed record; keys unique, order insignificant
    Object(FxHashMap<String, MarshalValue>),

    /// Tagged union: a single tag with an optional payload
    Variant {
        /// The variant tag
        tag: String,
        /// Payload, absent for payload-less variants
        payload: Option<Box<MarshalValue>>,
    },

    /// The runtime's "absent" value. Decode-only: the encoder never
    /// produces it, and the codec treats it exactly like `Null`.
    Undefined,
}

impl MarshalValue {
    /// Build a `Number` from a native integer
    pub fn int(i: i64) -> Self {
        MarshalValue::Number(i as f64)
    }

    /// Build an `Object` from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, MarshalValue)>,
        K: Into<String>,
    {
        MarshalValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Build a `Variant` with a payload
    pub fn variant(tag: impl Into<String>, payload: MarshalValue) -> Self {
        MarshalValue::Variant {
            tag: tag.into(),
            payload: Some(Box::new(payload)),
        }
    }

    /// Build a payload-less `Variant`
    pub fn unit_variant(tag: impl Into<String>) -> Self {
        MarshalValue::Variant {
            tag: tag.into(),
            payload: None,
        }
    }

    /// Check if this value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, MarshalValue::Null)
    }

    /// Check if this value is `Undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, MarshalValue::Undefined)
    }

    /// Check if this value means "no value" on the decode path
    /// (`Null` and `Undefined` are equivalent there)
    pub fn is_absent(&self) -> bool {
        matches!(self, MarshalValue::Null | MarshalValue::Undefined)
    }

    /// Get the boolean if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MarshalValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the number if this is a `Number`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MarshalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the string slice if this is a `String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarshalValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the elements if this is an `Array`
    pub fn as_array(&self) -> Option<&[MarshalValue]> {
        match self {
            MarshalValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Get the entries if this is an `Object`
    pub fn as_object(&self) -> Option<&FxHashMap<String, MarshalValue>> {
        match self {
            MarshalValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up an object entry, treating a missing key as `Undefined`.
    ///
    /// Mirrors the runtime's property access: absent properties are not an
    /// error, they are the absent value.
    pub fn get(&self, key: &str) -> &MarshalValue {
        static ABSENT: MarshalValue = MarshalValue::Undefined;
        match self {
            MarshalValue::Object(map) => map.get(key).unwrap_or(&ABSENT),
            _ => &ABSENT,
        }
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            MarshalValue::Null => "null",
            MarshalValue::Bool(_) => "boolean",
            MarshalValue::Number(_) => "number",
            MarshalValue::String(_) => "string",
            MarshalValue::Array(_) => "array",
            MarshalValue::Object(_) => "object",
            MarshalValue::Variant { .. } => "variant",
            MarshalValue::Undefined => "undefined",
        }
    }
}

impl Default for MarshalValue {
    fn default() -> Self {
        MarshalValue::Null
    }
}

impl PartialEq for MarshalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MarshalValue::Null, MarshalValue::Null) => true,
            (MarshalValue::Undefined, MarshalValue::Undefined) => true,
            (MarshalValue::Bool(a), MarshalValue::Bool(b)) => a == b,
            (MarshalValue::Number(a), MarshalValue::Number(b)) => {
                // NaN != NaN in IEEE 754, but two NaN wire values are the same value
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (MarshalValue::String(a), MarshalValue::String(b)) => a == b,
            (MarshalValue::Array(a), MarshalValue::Array(b)) => a == b,
            (MarshalValue::Object(a), MarshalValue::Object(b)) => a == b,
            (
                MarshalValue::Variant { tag: ta, payload: pa },
                MarshalValue::Variant { tag: tb, payload: pb },
            ) => ta == tb && pa == pb,
            _ => false,
        }
    }
}

impl fmt::Display for MarshalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalValue::Null => write!(f, "null"),
            MarshalValue::Bool(b) => write!(f, "{}", b),
            MarshalValue::Number(n) => write!(f, "{}", n),
            MarshalValue::String(s) => write!(f, "\"{}\"", s),
            MarshalValue::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            MarshalValue::Object(map) => {
                // Sorted so the rendering is stable across hash seeds
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, map[k.as_str()])?;
                }
                write!(f, "}}")
            }
            MarshalValue::Variant { tag, payload } => match payload {
                Some(p) => write!(f, "{}({})", tag, p),
                None => write!(f, "{}", tag),
            },
            MarshalValue::Undefined => write!(f, "undefined"),
        }
    }
}

impl From<bool> for MarshalValue {
    fn from(b: bool) -> Self {
        MarshalValue::Bool(b)
    }
}

impl From<i32> for MarshalValue {
    fn from(i: i32) -> Self {
        MarshalValue::Number(i as f64)
    }
}

impl From<i64> for MarshalValue {
    fn from(i: i64) -> Self {
        MarshalValue::Number(i as f64)
    }
}

impl From<f64> for MarshalValue {
    fn from(n: f64) -> Self {
        MarshalValue::Number(n)
    }
}

impl From<&str> for MarshalValue {
    fn from(s: &str) -> Self {
        MarshalValue::String(s.to_string())
    }
}

impl From<String> for MarshalValue {
    fn from(s: String) -> Self {
        MarshalValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(MarshalValue::Null.type_name(), "null");
        assert_eq!(MarshalValue::Bool(true).type_name(), "boolean");
        assert_eq!(MarshalValue::Number(42.0).type_name(), "number");
        assert_eq!(MarshalValue::from("x").type_name(), "string");
        assert_eq!(MarshalValue::Array(vec![]).type_name(), "array");
        assert_eq!(MarshalValue::object::<_, String>([]).type_name(), "object");
        assert_eq!(MarshalValue::unit_variant("A").type_name(), "variant");
        assert_eq!(MarshalValue::Undefined.type_name(), "undefined");
    }

    #[test]
    fn test_absence() {
        assert!(MarshalValue::Null.is_absent());
        assert!(MarshalValue::Undefined.is_absent());
        assert!(!MarshalValue::Number(0.0).is_absent());
        assert!(!MarshalValue::Bool(false).is_absent());
    }

    #[test]
    fn test_missing_property_is_undefined() {
        let obj = MarshalValue::object([("a", MarshalValue::int(1))]);
        assert_eq!(obj.get("a"), &MarshalValue::Number(1.0));
        assert!(obj.get("b").is_undefined());
        // Property access on a non-object is also the absent value
        assert!(MarshalValue::Null.get("a").is_undefined());
    }

    #[test]
    fn test_number_equality_with_nan() {
        assert_eq!(
            MarshalValue::Number(f64::NAN),
            MarshalValue::Number(f64::NAN)
        );
        assert_eq!(MarshalValue::Number(1.0), MarshalValue::Number(1.0));
        assert_ne!(MarshalValue::Number(1.0), MarshalValue::Number(2.0));
    }

    #[test]
    fn test_null_and_undefined_are_distinct_values() {
        // Equivalent for decoding, but not the same wire value
        assert_ne!(MarshalValue::Null, MarshalValue::Undefined);
    }

    #[test]
    fn test_variant_equality() {
        assert_eq!(
            MarshalValue::variant("Inc", MarshalValue::int(1)),
            MarshalValue::variant("Inc", MarshalValue::int(1))
        );
        assert_ne!(
            MarshalValue::variant("Inc", MarshalValue::int(1)),
            MarshalValue::unit_variant("Inc")
        );
        assert_ne!(
            MarshalValue::unit_variant("Inc"),
            MarshalValue::unit_variant("Dec")
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(MarshalValue::Null.to_string(), "null");
        assert_eq!(MarshalValue::int(42).to_string(), "42");
        assert_eq!(
            MarshalValue::Array(vec![MarshalValue::int(1), MarshalValue::Null]).to_string(),
            "[1, null]"
        );
        let obj = MarshalValue::object([
            ("b", MarshalValue::int(2)),
            ("a", MarshalValue::int(1)),
        ]);
        assert_eq!(obj.to_string(), "{a: 1, b: 2}");
        assert_eq!(
            MarshalValue::variant("Inc", MarshalValue::int(1)).to_string(),
            "Inc(1)"
        );
    }
}

//! Bidirectional marshaling codec
//!
//! Two paths cross the boundary:
//!
//! - the **typed path** (`ToWire` / `FromWire`): native Rust values convert
//!   to and from [`MarshalValue`] with strict checks on the way in;
//! - the **shape path** ([`decode`]): a dynamic value coming off the
//!   boundary is validated against an expected [`Shape`] and canonicalized
//!   before any native logic executes.
//!
//! Canonicalization folds the runtime's `Undefined` into `Null` wherever a
//! shape accepts "no value", so downstream code only ever sees `Null`.
//! Encoding never produces `Undefined` at all.

use crate::error::{CodecResult, DecodeError};
use crate::shape::Shape;
use crate::value::MarshalValue;
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Maximum recursion depth while validating nested values
const MAX_DECODE_DEPTH: usize = 64;

// ============================================================================
// Shape-driven validation
// ============================================================================

/// Validate a dynamic value against an expected shape and return its
/// canonical form.
///
/// Canonical values contain no `Undefined`: absence is folded to `Null`
/// where an option allows it, and records contain exactly their declared
/// fields. Any mismatch is a [`DecodeError`] naming the offending field or
/// shape.
pub fn decode(value: &MarshalValue, shape: &Shape) -> CodecResult<MarshalValue> {
    decode_at_depth(value, shape, 0)
}

fn decode_at_depth(
    value: &MarshalValue,
    shape: &Shape,
    depth: usize,
) -> CodecResult<MarshalValue> {
    if depth >= MAX_DECODE_DEPTH {
        return Err(DecodeError::MaxDepthExceeded);
    }

    match shape {
        Shape::Bool => match value {
            MarshalValue::Bool(b) => Ok(MarshalValue::Bool(*b)),
            other => Err(mismatch(shape, other)),
        },
        Shape::Integer => {
            let n = value.as_number().ok_or_else(|| mismatch(shape, value))?;
            check_integral(n)?;
            Ok(MarshalValue::Number(n))
        }
        Shape::Float => match value {
            MarshalValue::Number(n) => Ok(MarshalValue::Number(*n)),
            other => Err(mismatch(shape, other)),
        },
        Shape::String => match value {
            MarshalValue::String(s) => Ok(MarshalValue::String(s.clone())),
            other => Err(mismatch(shape, other)),
        },
        Shape::Option(inner) => {
            if value.is_absent() {
                Ok(MarshalValue::Null)
            } else {
                decode_at_depth(value, inner, depth + 1)
            }
        }
        Shape::Array(element) => match value {
            MarshalValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(decode_at_depth(item, element, depth + 1)?);
                }
                Ok(MarshalValue::Array(out))
            }
            other => Err(mismatch(shape, other)),
        },
        Shape::Map(element) => match value {
            MarshalValue::Object(map) => {
                let mut out = FxHashMap::default();
                for (key, item) in map {
                    out.insert(key.clone(), decode_at_depth(item, element, depth + 1)?);
                }
                Ok(MarshalValue::Object(out))
            }
            other => Err(mismatch(shape, other)),
        },
        Shape::Record(fields) => match value {
            MarshalValue::Object(_) => {
                // Unknown extra keys are tolerated; declared fields are strict
                let mut out = FxHashMap::default();
                for (name, field_shape) in fields {
                    let field_value = value.get(name);
                    let decoded = decode_at_depth(field_value, field_shape, depth + 1)
                        .map_err(|e| e.in_field(name))?;
                    out.insert(name.clone(), decoded);
                }
                Ok(MarshalValue::Object(out))
            }
            other => Err(mismatch(shape, other)),
        },
        Shape::Union(variants) => decode_union(value, variants, shape, depth),
        Shape::Ordinal(names) => {
            let n = value.as_number().ok_or_else(|| mismatch(shape, value))?;
            check_integral(n)?;
            let ordinal = n as i64;
            if ordinal < 0 || ordinal as usize >= names.len() {
                return Err(DecodeError::UnknownOrdinal(ordinal, names.len()));
            }
            Ok(MarshalValue::Number(n))
        }
        Shape::Json => canonicalize_json(value, depth),
    }
}

/// Tagged unions arrive either as a `Variant` (already converted at the
/// boundary) or as a single-key object literal. Both canonicalize to
/// `Variant`.
fn decode_union(
    value: &MarshalValue,
    variants: &[(String, Option<Shape>)],
    shape: &Shape,
    depth: usize,
) -> CodecResult<MarshalValue> {
    let (tag, payload): (&str, Option<&MarshalValue>) = match value {
        MarshalValue::Variant { tag, payload } => {
            (tag.as_str(), payload.as_deref())
        }
        MarshalValue::Object(map) => {
            if map.len() != 1 {
                return Err(DecodeError::MalformedVariant(map.len()));
            }
            let (tag, payload) = map.iter().next().expect("len checked above");
            (tag.as_str(), Some(payload))
        }
        other => return Err(mismatch(shape, other)),
    };

    let declared = variants
        .iter()
        .find(|(name, _)| name == tag)
        .ok_or_else(|| DecodeError::UnknownTag(tag.to_string()))?;

    match &declared.1 {
        // Payload-less variant: an explicit null payload is still valid
        None => match payload {
            None => Ok(MarshalValue::unit_variant(tag)),
            Some(p) if p.is_absent() => Ok(MarshalValue::unit_variant(tag)),
            Some(p) => Err(DecodeError::TypeMismatch {
                expected: format!("{} without payload", tag),
                actual: p.type_name().to_string(),
            }),
        },
        // Variant with a declared payload shape. A present tag with a null
        // payload is valid for optional payloads and distinct from the tag
        // being absent altogether.
        Some(payload_shape) => {
            static ABSENT: MarshalValue = MarshalValue::Undefined;
            let raw = payload.unwrap_or(&ABSENT);
            let decoded = decode_at_depth(raw, payload_shape, depth + 1)
                .map_err(|e| e.in_field(tag))?;
            Ok(MarshalValue::variant(tag, decoded))
        }
    }
}

/// Fold a JSON-like tree into its canonical form: `Undefined` becomes
/// `Null`, variants become single-key objects.
fn canonicalize_json(value: &MarshalValue, depth: usize) -> CodecResult<MarshalValue> {
    if depth >= MAX_DECODE_DEPTH {
        return Err(DecodeError::MaxDepthExceeded);
    }
    Ok(match value {
        MarshalValue::Undefined => MarshalValue::Null,
        MarshalValue::Array(items) => MarshalValue::Array(
            items
                .iter()
                .map(|v| canonicalize_json(v, depth + 1))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        MarshalValue::Object(map) => {
            let mut out = FxHashMap::default();
            for (k, v) in map {
                out.insert(k.clone(), canonicalize_json(v, depth + 1)?);
            }
            MarshalValue::Object(out)
        }
        MarshalValue::Variant { tag, payload } => {
            let inner = match payload {
                Some(p) => canonicalize_json(p, depth + 1)?,
                None => MarshalValue::Null,
            };
            MarshalValue::object([(tag.clone(), inner)])
        }
        other => other.clone(),
    })
}

fn mismatch(shape: &Shape, value: &MarshalValue) -> DecodeError {
    DecodeError::TypeMismatch {
        expected: shape.to_string(),
        actual: value.type_name().to_string(),
    }
}

fn check_integral(n: f64) -> CodecResult<()> {
    if !n.is_finite() {
        return Err(DecodeError::NonFinite(n));
    }
    if n.fract() != 0.0 {
        return Err(DecodeError::NotIntegral(n));
    }
    Ok(())
}

// ============================================================================
// Typed conversion traits
// ============================================================================

/// Convert a native value to its wire representation.
///
/// Encoding is total: every implementor maps to exactly one wire shape, and
/// `None` always encodes as `Null`.
pub trait ToWire {
    /// Convert to a wire value
    fn to_wire(&self) -> MarshalValue;
}

/// Convert a wire value back into a native value.
///
/// Decoding is strict: a shape mismatch is a [`DecodeError`], never a
/// coercion.
pub trait FromWire: Sized {
    /// Convert from a wire value
    fn from_wire(value: &MarshalValue) -> CodecResult<Self>;
}

impl<T: ToWire + ?Sized> ToWire for &T {
    fn to_wire(&self) -> MarshalValue {
        (**self).to_wire()
    }
}

impl ToWire for bool {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Bool(*self)
    }
}

impl FromWire for bool {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        value.as_bool().ok_or_else(|| DecodeError::TypeMismatch {
            expected: "boolean".to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

fn integer_from_wire(value: &MarshalValue, target: &'static str) -> CodecResult<f64> {
    let n = value.as_number().ok_or_else(|| DecodeError::TypeMismatch {
        expected: target.to_string(),
        actual: value.type_name().to_string(),
    })?;
    check_integral(n)?;
    Ok(n)
}

macro_rules! impl_wire_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ToWire for $ty {
                fn to_wire(&self) -> MarshalValue {
                    MarshalValue::Number(*self as f64)
                }
            }

            impl FromWire for $ty {
                fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
                    let n = integer_from_wire(value, $name)?;
                    if n < <$ty>::MIN as f64 || n > <$ty>::MAX as f64 {
                        return Err(DecodeError::OutOfRange {
                            value: n,
                            target: $name,
                        });
                    }
                    Ok(n as $ty)
                }
            }
        )*
    };
}

impl_wire_int!(
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    usize => "usize",
);

impl ToWire for f64 {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Number(*self)
    }
}

impl FromWire for f64 {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        value.as_number().ok_or_else(|| DecodeError::TypeMismatch {
            expected: "number".to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

impl ToWire for f32 {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Number(*self as f64)
    }
}

impl FromWire for f32 {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        Ok(f64::from_wire(value)? as f32)
    }
}

impl ToWire for str {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::String(self.to_string())
    }
}

impl ToWire for String {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::String(self.clone())
    }
}

impl FromWire for String {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| DecodeError::TypeMismatch {
                expected: "string".to_string(),
                actual: value.type_name().to_string(),
            })
    }
}

// Unit crosses as null, matching void-returning calls
impl ToWire for () {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Null
    }
}

impl<T: ToWire> ToWire for Option<T> {
    fn to_wire(&self) -> MarshalValue {
        match self {
            Some(v) => v.to_wire(),
            None => MarshalValue::Null,
        }
    }
}

impl<T: FromWire> FromWire for Option<T> {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        if value.is_absent() {
            Ok(None)
        } else {
            Ok(Some(T::from_wire(value)?))
        }
    }
}

impl<T: ToWire> ToWire for Vec<T> {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Array(self.iter().map(ToWire::to_wire).collect())
    }
}

impl<T: FromWire> FromWire for Vec<T> {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        let items = value.as_array().ok_or_else(|| DecodeError::TypeMismatch {
            expected: "array".to_string(),
            actual: value.type_name().to_string(),
        })?;
        items.iter().map(T::from_wire).collect()
    }
}

impl<T: ToWire> ToWire for HashMap<String, T> {
    fn to_wire(&self) -> MarshalValue {
        MarshalValue::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_wire()))
                .collect(),
        )
    }
}

impl<T: FromWire> FromWire for HashMap<String, T> {
    fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
        let map = value.as_object().ok_or_else(|| DecodeError::TypeMismatch {
            expected: "object".to_string(),
            actual: value.type_name().to_string(),
        })?;
        map.iter()
            .map(|(k, v)| Ok((k.clone(), T::from_wire(v)?)))
            .collect()
    }
}

// Tuples cross the wire as fixed-length arrays
macro_rules! impl_wire_tuple {
    ($len:literal; $($name:ident : $idx:tt),+) => {
        impl<$($name: ToWire),+> ToWire for ($($name,)+) {
            fn to_wire(&self) -> MarshalValue {
                MarshalValue::Array(vec![$(self.$idx.to_wire()),+])
            }
        }

        impl<$($name: FromWire),+> FromWire for ($($name,)+) {
            fn from_wire(value: &MarshalValue) -> CodecResult<Self> {
                let items = value.as_array().ok_or_else(|| DecodeError::TypeMismatch {
                    expected: format!("array of {}", $len),
                    actual: value.type_name().to_string(),
                })?;
                if items.len() != $len {
                    return Err(DecodeError::TypeMismatch {
                        expected: format!("array of {}", $len),
                        actual: format!("array of {}", items.len()),
                    });
                }
                Ok(($($name::from_wire(&items[$idx])?,)+))
            }
        }
    };
}

impl_wire_tuple!(2; A: 0, B: 1);
impl_wire_tuple!(3; A: 0, B: 1, C: 2);
impl_wire_tuple!(4; A: 0, B: 1, C: 2, D: 3);

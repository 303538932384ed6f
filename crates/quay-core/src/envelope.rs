//! Error envelopes and the throw/suppress translation policy
//!
//! Every native failure crossing the boundary is an [`ErrorEnvelope`]:
//! either a plain text payload or a structured payload with a code, a
//! message, and an optional nested cause. A call site delivers envelopes
//! under one of two fixed policies: throwing (raise a runtime exception)
//! or suppressing (return the envelope as an ordinary, checkable value).
//! The payload shape is identical under both; only control flow differs.

use crate::codec::FromWire;
use crate::error::{CodecResult, DecodeError};
use crate::value::MarshalValue;

/// A native failure payload crossing the boundary.
///
/// Envelopes nest: a control-flow-level failure may wrap a domain-level
/// failure as its `cause`, to arbitrary depth.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorEnvelope {
    /// Unstructured failure, text only
    #[error("{0}")]
    Plain(String),

    /// Domain failure with a code, message, and optional nested cause
    #[error("{msg} (code {code})")]
    Structured {
        /// Numeric error code
        code: i64,
        /// Human-readable message
        msg: String,
        /// Nested wrapped failure, if any
        cause: Option<Box<ErrorEnvelope>>,
    },
}

impl ErrorEnvelope {
    /// Build a structured envelope without a cause
    pub fn structured(code: i64, msg: impl Into<String>) -> Self {
        ErrorEnvelope::Structured {
            code,
            msg: msg.into(),
            cause: None,
        }
    }

    /// Wrap another envelope as this envelope's cause
    pub fn with_cause(self, cause: ErrorEnvelope) -> Self {
        match self {
            ErrorEnvelope::Structured { code, msg, .. } => ErrorEnvelope::Structured {
                code,
                msg,
                cause: Some(Box::new(cause)),
            },
            // A plain envelope has no slot for a cause; wrapping promotes it
            ErrorEnvelope::Plain(msg) => ErrorEnvelope::Structured {
                code: 0,
                msg,
                cause: Some(Box::new(cause)),
            },
        }
    }

    /// Walk to the innermost cause
    pub fn root_cause(&self) -> &ErrorEnvelope {
        match self {
            ErrorEnvelope::Structured {
                cause: Some(inner), ..
            } => inner.root_cause(),
            other => other,
        }
    }

    /// Encode as the error-like wire object.
    ///
    /// Plain envelopes carry only a `message`. Structured envelopes add an
    /// `err` object with `code`, `msg`, and a `cause` that nests the same
    /// object shape (or null).
    pub fn to_wire(&self) -> MarshalValue {
        match self {
            ErrorEnvelope::Plain(msg) => {
                MarshalValue::object([("message", MarshalValue::String(msg.clone()))])
            }
            ErrorEnvelope::Structured { msg, .. } => MarshalValue::object([
                ("message", MarshalValue::String(msg.clone())),
                ("err", self.err_object()),
            ]),
        }
    }

    fn err_object(&self) -> MarshalValue {
        match self {
            ErrorEnvelope::Plain(msg) => {
                // A plain cause nested under a structured chain keeps its
                // textual payload only
                MarshalValue::object([("msg", MarshalValue::String(msg.clone()))])
            }
            ErrorEnvelope::Structured { code, msg, cause } => MarshalValue::object([
                ("code", MarshalValue::int(*code)),
                ("msg", MarshalValue::String(msg.clone())),
                (
                    "cause",
                    match cause {
                        Some(inner) => inner.err_object(),
                        None => MarshalValue::Null,
                    },
                ),
            ]),
        }
    }

    /// Decode an error-like wire object back into an envelope.
    ///
    /// The inverse of [`ErrorEnvelope::to_wire`]; structured cause chains
    /// round-trip without loss at any depth.
    pub fn from_wire(value: &MarshalValue) -> CodecResult<ErrorEnvelope> {
        let message = String::from_wire(value.get("message")).map_err(|e| e.in_field("message"))?;
        match value.get("err") {
            v if v.is_absent() => Ok(ErrorEnvelope::Plain(message)),
            err => Self::err_from_wire(err),
        }
    }

    fn err_from_wire(value: &MarshalValue) -> CodecResult<ErrorEnvelope> {
        let msg = String::from_wire(value.get("msg")).map_err(|e| e.in_field("msg"))?;
        if value.get("code").is_absent() {
            return Ok(ErrorEnvelope::Plain(msg));
        }
        let code = i64::from_wire(value.get("code")).map_err(|e| e.in_field("code"))?;
        let cause = match value.get("cause") {
            v if v.is_absent() => None,
            nested => Some(Box::new(Self::err_from_wire(nested)?)),
        };
        Ok(ErrorEnvelope::Structured { code, msg, cause })
    }
}

impl From<String> for ErrorEnvelope {
    fn from(s: String) -> Self {
        ErrorEnvelope::Plain(s)
    }
}

impl From<&str> for ErrorEnvelope {
    fn from(s: &str) -> Self {
        ErrorEnvelope::Plain(s.to_string())
    }
}

impl From<DecodeError> for ErrorEnvelope {
    fn from(e: DecodeError) -> Self {
        ErrorEnvelope::Plain(e.to_string())
    }
}

// ============================================================================
// Delivery policy
// ============================================================================

/// How a call site delivers failures to the runtime.
///
/// The policy is fixed per call site, not per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Raise a runtime exception carrying the payload
    Throwing,

    /// Return the payload as an ordinary value the caller must check
    Suppressing,
}

/// A failure translated for delivery.
///
/// The payload is byte-identical under both policies; only the delivery
/// channel differs, so a caller can always distinguish success values from
/// error values by the payload's `message`/`err` markers.
#[derive(Debug, Clone, PartialEq)]
pub enum Translated {
    /// Deliver by raising a runtime exception
    Thrown(MarshalValue),

    /// Deliver as the call's return value
    Returned(MarshalValue),
}

impl Translated {
    /// The error-like payload, whichever way it is delivered
    pub fn payload(&self) -> &MarshalValue {
        match self {
            Translated::Thrown(v) | Translated::Returned(v) => v,
        }
    }
}

/// Translate a native failure for delivery under the call site's policy.
pub fn translate(envelope: &ErrorEnvelope, policy: ErrorPolicy) -> Translated {
    let payload = envelope.to_wire();
    match policy {
        ErrorPolicy::Throwing => Translated::Thrown(payload),
        ErrorPolicy::Suppressing => Translated::Returned(payload),
    }
}

/// Check whether a wire value is an error payload rather than a success
/// value. Suppressing call sites rely on this marker being unambiguous.
pub fn is_error_payload(value: &MarshalValue) -> bool {
    match value.as_object() {
        Some(map) => map.contains_key("message") && matches!(map.get("message"), Some(MarshalValue::String(_))),
        None => false,
    }
}

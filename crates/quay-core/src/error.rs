//! Decode error taxonomy for the marshaling codec

/// Result type for codec operations
pub type CodecResult<T> = Result<T, DecodeError>;

/// Shape mismatch during marshaling.
///
/// Decode errors are local to a single call: they surface to the immediate
/// caller and are never retried or swallowed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Value does not match the expected shape
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual value description
        actual: String,
    },

    /// A required record field does not match its declared shape
    #[error("Field '{field}': expected {expected}, got {actual}")]
    Field {
        /// Field name as declared
        field: String,
        /// Expected shape description
        expected: String,
        /// Actual value description
        actual: String,
    },

    /// Non-finite number decoded against an integer-typed target
    #[error("Non-finite number for integer target: {0}")]
    NonFinite(f64),

    /// Fractional number decoded against an integer-typed target
    #[error("Number {0} is not an integer")]
    NotIntegral(f64),

    /// Integer value out of range for the target type
    #[error("Number {value} out of range for {target}")]
    OutOfRange {
        /// The offending value
        value: f64,
        /// Target type name
        target: &'static str,
    },

    /// Variant tag not recognized by the target union
    #[error("Unknown variant tag '{0}'")]
    UnknownTag(String),

    /// A tagged-union wire value must carry exactly one tag key
    #[error("Malformed variant: expected exactly one tag key, got {0}")]
    MalformedVariant(usize),

    /// Ordinal outside the enumeration's declared range
    #[error("Ordinal {0} out of range for enumeration of {1} members")]
    UnknownOrdinal(i64, usize),

    /// Recursion limit hit while validating a nested value
    #[error("Maximum decode depth exceeded")]
    MaxDepthExceeded,
}

impl DecodeError {
    /// Attach a field name to an error produced while decoding that field
    pub fn in_field(self, field: &str) -> DecodeError {
        match self {
            DecodeError::TypeMismatch { expected, actual } => DecodeError::Field {
                field: field.to_string(),
                expected,
                actual,
            },
            other => other,
        }
    }
}

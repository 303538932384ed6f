//! Shape — expected-shape descriptions for dynamic validation
//!
//! A `Shape` describes what a call site expects a dynamic runtime value to
//! look like. Duck-typed values coming off the boundary are validated
//! against a shape before any native logic runs; shapes also describe
//! callback signatures so that argument lists can be checked at invocation
//! time.

use std::fmt;

/// Expected shape of a wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Boolean
    Bool,

    /// Number constrained to an integral, finite value
    Integer,

    /// Any number
    Float,

    /// String
    String,

    /// Optional value: `Null` and `Undefined` decode to "no value"
    Option(Box<Shape>),

    /// Ordered list with a uniform element shape
    Array(Box<Shape>),

    /// String-keyed map with a uniform value shape
    Map(Box<Shape>),

    /// Record with declared fields; decoding is strict per field
    Record(Vec<(String, Shape)>),

    /// Tagged union: variant names with optional payload shapes
    Union(Vec<(String, Option<Shape>)>),

    /// Payload-less enumeration; the wire value is the declaration ordinal
    Ordinal(Vec<String>),

    /// Any JSON-like tree. Valid only for values passed whole across the
    /// bridge; nested shapes stay strict.
    Json,
}

impl Shape {
    /// Shorthand for `Option(shape)`
    pub fn option(shape: Shape) -> Shape {
        Shape::Option(Box::new(shape))
    }

    /// Shorthand for `Array(shape)`
    pub fn array(shape: Shape) -> Shape {
        Shape::Array(Box::new(shape))
    }

    /// Shorthand for `Map(shape)`
    pub fn map(shape: Shape) -> Shape {
        Shape::Map(Box::new(shape))
    }

    /// Shorthand for a record shape
    pub fn record<I, K>(fields: I) -> Shape
    where
        I: IntoIterator<Item = (K, Shape)>,
        K: Into<String>,
    {
        Shape::Record(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// Check whether this shape accepts "no value"
    pub fn accepts_absent(&self) -> bool {
        matches!(self, Shape::Option(_) | Shape::Json)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Bool => write!(f, "boolean"),
            Shape::Integer => write!(f, "integer"),
            Shape::Float => write!(f, "number"),
            Shape::String => write!(f, "string"),
            Shape::Option(inner) => write!(f, "option<{}>", inner),
            Shape::Array(inner) => write!(f, "array<{}>", inner),
            Shape::Map(inner) => write!(f, "map<{}>", inner),
            Shape::Record(fields) => {
                write!(f, "record{{")?;
                for (i, (name, shape)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, shape)?;
                }
                write!(f, "}}")
            }
            Shape::Union(variants) => {
                write!(f, "union<")?;
                for (i, (tag, _)) in variants.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", tag)?;
                }
                write!(f, ">")
            }
            Shape::Ordinal(names) => write!(f, "enum[{}]", names.len()),
            Shape::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::Integer.to_string(), "integer");
        assert_eq!(Shape::option(Shape::Integer).to_string(), "option<integer>");
        assert_eq!(
            Shape::array(Shape::String).to_string(),
            "array<string>"
        );
        assert_eq!(
            Shape::record([("a", Shape::Integer), ("b", Shape::String)]).to_string(),
            "record{a: integer, b: string}"
        );
        assert_eq!(
            Shape::Union(vec![
                ("IncValue".to_string(), Some(Shape::Integer)),
                ("Shutdown".to_string(), None),
            ])
            .to_string(),
            "union<IncValue | Shutdown>"
        );
    }

    #[test]
    fn test_accepts_absent() {
        assert!(Shape::option(Shape::Integer).accepts_absent());
        assert!(Shape::Json.accepts_absent());
        assert!(!Shape::Integer.accepts_absent());
        assert!(!Shape::array(Shape::option(Shape::Integer)).accepts_absent());
    }
}

//! Declaration model
//!
//! Native type definitions are described as a graph of [`TypeDecl`]s
//! partitioned into named modules. References between declarations are
//! carried by name; the emitter resolves each reference to exactly one
//! owning module.

use std::collections::BTreeSet;

/// A type reference appearing in a field or payload position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `boolean`
    Bool,
    /// `number`
    Number,
    /// `string`
    String,
    /// Optional value; renders as `T | null`
    Option(Box<TypeRef>),
    /// `T[]`
    Array(Box<TypeRef>),
    /// `Record<string, T>`
    Map(Box<TypeRef>),
    /// Reference to another declaration by name
    Named(String),
}

impl TypeRef {
    /// Shorthand for an optional reference
    pub fn option(inner: TypeRef) -> TypeRef {
        TypeRef::Option(Box::new(inner))
    }

    /// Shorthand for an array reference
    pub fn array(inner: TypeRef) -> TypeRef {
        TypeRef::Array(Box::new(inner))
    }

    /// Shorthand for a string-keyed map reference
    pub fn map(inner: TypeRef) -> TypeRef {
        TypeRef::Map(Box::new(inner))
    }

    /// Shorthand for a named reference
    pub fn named(name: impl Into<String>) -> TypeRef {
        TypeRef::Named(name.into())
    }

    fn collect_names(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeRef::Bool | TypeRef::Number | TypeRef::String => {}
            TypeRef::Option(inner) | TypeRef::Array(inner) | TypeRef::Map(inner) => {
                inner.collect_names(out)
            }
            TypeRef::Named(name) => {
                out.insert(name.clone());
            }
        }
    }

    /// Render as TypeScript reference syntax.
    pub fn render(&self) -> String {
        match self {
            TypeRef::Bool => "boolean".to_string(),
            TypeRef::Number => "number".to_string(),
            TypeRef::String => "string".to_string(),
            TypeRef::Option(inner) => format!("{} | null", inner.render()),
            TypeRef::Array(inner) => match inner.as_ref() {
                // Option elements need grouping: (T | null)[]
                TypeRef::Option(_) => format!("({})[]", inner.render()),
                _ => format!("{}[]", inner.render()),
            },
            TypeRef::Map(inner) => format!("Record<string, {}>", inner.render()),
            TypeRef::Named(name) => name.clone(),
        }
    }
}

/// The kind of a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// Enumeration. Payload-less variants render as a numeric `enum` with
    /// explicit declaration-order ordinals; variants with payloads render
    /// as a union of single-tag object shapes.
    Enum {
        /// Variants in declaration order, each with an optional payload
        variants: Vec<(String, Option<TypeRef>)>,
    },

    /// Interface with named fields.
    Interface {
        /// Fields in declaration order
        fields: Vec<(String, TypeRef)>,
    },
}

/// A single type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Declared name, unique across all modules
    pub name: String,
    /// What the declaration is
    pub kind: DeclKind,
}

impl TypeDecl {
    /// Declare an interface
    pub fn interface<I, K>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, TypeRef)>,
        K: Into<String>,
    {
        TypeDecl {
            name: name.into(),
            kind: DeclKind::Interface {
                fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            },
        }
    }

    /// Declare an enumeration
    pub fn enumeration<I, K>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<TypeRef>)>,
        K: Into<String>,
    {
        TypeDecl {
            name: name.into(),
            kind: DeclKind::Enum {
                variants: variants.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            },
        }
    }

    /// Every declaration name this declaration references.
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match &self.kind {
            DeclKind::Enum { variants } => {
                for (_, payload) in variants {
                    if let Some(type_ref) = payload {
                        type_ref.collect_names(&mut out);
                    }
                }
            }
            DeclKind::Interface { fields } => {
                for (_, type_ref) in fields {
                    type_ref.collect_names(&mut out);
                }
            }
        }
        out
    }
}

/// A named module: a subset of the declaration graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecls {
    /// Module name; becomes the output file name
    pub name: String,
    /// Declarations in any order; input order is insignificant
    pub decls: Vec<TypeDecl>,
}

impl ModuleDecls {
    /// Create a module from declarations
    pub fn new(name: impl Into<String>, decls: Vec<TypeDecl>) -> Self {
        Self {
            name: name.into(),
            decls,
        }
    }
}

//! Quay declaration emitter
//!
//! Consumes native type definitions (the declaration graph) and produces
//! merged, dependency-ordered TypeScript declaration modules for
//! statically-typed consumers. Independent of the runtime bridge at
//! execution time.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod case;
pub mod emit;
pub mod graph;

pub use case::to_camel_case;
pub use emit::{emit, emit_with, write_to, EmitOptions, RenderedModule};
pub use graph::{DeclKind, ModuleDecls, TypeDecl, TypeRef};

/// Declaration emission errors
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// A type name is defined by more than one module
    #[error("Type '{name}' is defined in both '{first}' and '{second}'")]
    DuplicateDefinition {
        /// The duplicated type name
        name: String,
        /// Module that defined it first
        first: String,
        /// Module that defined it again
        second: String,
    },

    /// A reference has no owning module
    #[error("Unresolved reference '{name}' in module '{module}'")]
    Unresolved {
        /// The unknown type name
        name: String,
        /// Module containing the reference
        module: String,
    },

    /// Writing rendered output failed
    #[error("Failed to write declarations: {0}")]
    Io(#[from] std::io::Error),
}

//! Quay core — wire value model, marshaling codec, and error envelopes
//!
//! This crate provides the runtime-independent half of the Quay bridge:
//! - `MarshalValue`, the canonical wire value crossing the boundary
//! - `Shape` descriptions and the validating/canonicalizing decoder
//! - `ToWire`/`FromWire` typed conversion traits
//! - serde_json interop for JSON-typed payloads
//! - `ErrorEnvelope` failures and the throw/suppress translation policy
//!
//! Nothing here touches the scripting runtime; the bridge crate wires
//! these pieces to the runtime seams.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod envelope;
pub mod error;
pub mod json;
pub mod shape;
pub mod value;

pub use codec::{decode, FromWire, ToWire};
pub use envelope::{is_error_payload, translate, ErrorEnvelope, ErrorPolicy, Translated};
pub use error::{CodecResult, DecodeError};
pub use json::{from_json, to_json};
pub use shape::Shape;
pub use value::MarshalValue;

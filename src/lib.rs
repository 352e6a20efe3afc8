// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # rbmarshal
//!
//! Decoder for Ruby Marshal 4.8 streams.
//!
//! A stream decodes into a [`MarshalGraph`]: an arena of nodes addressed by
//! small handles, a symbol table, and the object reference table that
//! back-references index into. Shared and self-referencing values come out
//! as shared handles, never as copies.
//!
//! - [`marshal`] - Cursor, tag table, decode context and the decoder
//! - [`core`] - Values, the graph, and the error taxonomy
//! - [`json`] - Lossy JSON projection with a cycle policy
//! - [`io`] - Memory-mapped sources and data-file discovery
//!
//! ## Example: Decoding a file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rbmarshal::marshal::MarshalDecoder;
//!
//! let graph = MarshalDecoder::new().decode_file("Data/Actors.rvdata2")?;
//! for item in graph.array(graph.root()).unwrap_or_default() {
//!     if let Some(name) = graph.object(item).and_then(|o| o.get("@name")) {
//!         println!("{}", graph.text(name).unwrap_or_default());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: JSON
//!
//! ```rust
//! let json = rbmarshal::to_json(&[0x04, 0x08, b'[', 0x06, b'T']).unwrap();
//! assert_eq!(json, serde_json::json!([true]));
//! ```

// Core types
pub mod core;

pub use self::core::{
    HashKey, Integer, KeyContent, MarshalError, MarshalGraph, Node, NodeId, RbHash, RbObject,
    RbString, RbSymbol, Result, SymbolId, Value,
};

// Stream decoding
pub mod marshal;

pub use marshal::{DecoderConfig, MarshalDecoder};

// JSON projection
pub mod json;

pub use json::{JsonProjector, ProjectionConfig};

// Byte sources and file discovery
pub mod io;

/// Decode a stream with the default configuration.
pub fn from_slice(data: &[u8]) -> Result<MarshalGraph> {
    MarshalDecoder::new().decode(data)
}

/// Decode a stream and project its root with the default configuration.
pub fn to_json(data: &[u8]) -> Result<serde_json::Value> {
    let graph = from_slice(data)?;
    JsonProjector::new(&graph).project_root()
}

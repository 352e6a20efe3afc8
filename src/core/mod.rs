// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout rbmarshal.
//!
//! This module provides the foundational types for the library:
//! - [`MarshalError`] - Error taxonomy for decoding and projection
//! - [`Value`] / [`Node`] - Handle-based value representation
//! - [`MarshalGraph`] - The decoded graph with link-following accessors

pub mod error;
pub mod graph;
pub mod value;

pub use error::{MarshalError, ReferenceTable, Result};
pub use graph::MarshalGraph;
pub use value::{
    HashKey, Integer, KeyContent, Node, NodeId, RbData, RbExtended, RbFields, RbFloat, RbHash,
    RbInstance, RbObject, RbRegexp, RbString, RbSymbol, RbUserClass, RbUserDefined,
    RbUserMarshal, RegexpFlags, SymbolId, Value,
};

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Marshal 4.8 decoding.
//!
//! - [`MarshalCursor`] - Bounds-checked primitive reads
//! - [`Tag`] - Wire tag table
//! - [`DecodeContext`] - Per-session tables and reference resolution
//! - [`MarshalDecoder`] - Tag dispatch and variant decoders

pub mod config;
pub mod context;
pub mod cursor;
pub mod decoder;
pub mod tag;

pub use config::{DecoderConfig, FixnumSign};
pub use context::{DecodeContext, PathSegment};
pub use cursor::MarshalCursor;
pub use decoder::{MarshalDecoder, SIGNATURE};
pub use tag::Tag;

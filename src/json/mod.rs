// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! JSON projection module.
//!
//! Renders a decoded graph as a `serde_json` tree for interchange and
//! inspection.

pub mod projector;

pub use projector::{
    BytesEncoding, CyclePolicy, JsonProjector, ProjectionConfig, SharedPolicy, DEFAULT_MAX_NODES,
    DEFAULT_PROJECTION_DEPTH, MAX_SAFE_INTEGER,
};

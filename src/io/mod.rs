// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer: byte sources and data-file discovery.

pub mod scan;
pub mod source;

pub use scan::{scan_dir, ScanOptions, DEFAULT_EXTENSION};
pub use source::MarshalSource;

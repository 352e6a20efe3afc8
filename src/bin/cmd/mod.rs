// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod inspect;
mod json;
mod scan;

pub use inspect::InspectCmd;
pub use json::JsonCmd;
pub use scan::ScanCmd;

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Json command - print the JSON projection of one file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use crate::common::{CliConfig, Result};
use rbmarshal::json::{BytesEncoding, CyclePolicy, JsonProjector, SharedPolicy};
use rbmarshal::MarshalDecoder;

/// Decode a file and print its JSON projection.
#[derive(Args, Clone, Debug)]
pub struct JsonCmd {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit {"$ref": n} for cycles instead of failing
    #[arg(long)]
    refs: bool,

    /// Emit {"$ref": n} for every repeat visit of a shared object
    #[arg(long)]
    shared_refs: bool,

    /// Render opaque payloads as hex strings
    #[arg(long)]
    hex: bool,

    /// Project strings carrying only an encoding marker as plain strings
    #[arg(long)]
    collapse_encoding: bool,
}

impl JsonCmd {
    pub fn run(self, config: &CliConfig) -> Result<()> {
        let decoder = MarshalDecoder::with_config(config.decoder.clone());
        let graph = decoder
            .decode_file(&self.input)
            .with_context(|| format!("Failed to decode '{}'", self.input.display()))?;

        let mut projection = config.projection.clone();
        if self.refs {
            projection.cycle_policy = CyclePolicy::Reference;
        }
        if self.shared_refs {
            projection.shared_policy = SharedPolicy::Reference;
        }
        if self.hex {
            projection.bytes = BytesEncoding::Hex;
        }
        if self.collapse_encoding {
            projection.collapse_encoding = true;
        }

        let json = JsonProjector::with_config(&graph, projection)
            .project_root()
            .with_context(|| format!("Failed to project '{}'", self.input.display()))?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };

        match self.output {
            Some(path) => fs::write(&path, format!("{text}\n"))
                .with_context(|| format!("Failed to write '{}'", path.display()))?,
            None => println!("{text}"),
        }

        Ok(())
    }
}

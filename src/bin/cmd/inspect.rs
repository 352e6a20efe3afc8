// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - show the decoded tables of one file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use crate::common::{format_size, CliConfig, Result};
use rbmarshal::io::MarshalSource;
use rbmarshal::MarshalDecoder;

/// Show root kind, table sizes and the symbol table.
#[derive(Args, Clone, Debug)]
pub struct InspectCmd {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Skip the symbol listing
    #[arg(long)]
    no_symbols: bool,
}

impl InspectCmd {
    pub fn run(self, config: &CliConfig) -> Result<()> {
        let source = MarshalSource::open(&self.input)?;
        let graph = MarshalDecoder::with_config(config.decoder.clone())
            .decode(source.data())
            .with_context(|| format!("Failed to decode '{}'", self.input.display()))?;

        println!("=== {} ===", self.input.display());
        println!("Size: {}", format_size(source.len()));
        drop(source);

        let root = graph.root();
        match graph.class_name(root) {
            Some(class) => println!("Root: {} ({class})", graph.kind(root)),
            None => println!("Root: {}", graph.kind(root)),
        }
        println!("Symbols: {}", graph.symbols().len());
        println!("Objects: {}", graph.object_table().len());
        println!("Nodes: {}", graph.node_count());

        let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
        for (_, node) in graph.nodes() {
            *kinds.entry(node.kind()).or_default() += 1;
        }
        println!();
        println!("Node kinds:");
        for (kind, count) in &kinds {
            println!("  {kind:<14} {count}");
        }

        if !self.no_symbols {
            println!();
            println!("Symbol table:");
            for (index, symbol) in graph.symbols().iter().enumerate() {
                println!("  [{index}] {}", symbol.name());
            }
        }

        Ok(())
    }
}

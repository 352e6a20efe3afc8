// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Scan command - decode every matching file in a directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context as _};
use clap::Args;
use rayon::prelude::*;
use regex::Regex;
use tracing::warn;

use crate::common::{CliConfig, ProgressBar, Result};
use rbmarshal::io::{scan_dir, ScanOptions, DEFAULT_EXTENSION};
use rbmarshal::json::{JsonProjector, ProjectionConfig};
use rbmarshal::{MarshalDecoder, MarshalError};

/// Decode every matching file in a directory.
#[derive(Args, Clone, Debug)]
pub struct ScanCmd {
    /// Directory to scan
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// File extension to match (empty matches all files)
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    ext: String,

    /// Only files whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    pattern: Option<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Stop starting new files after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Also project each decoded file to JSON
    #[arg(long)]
    json: bool,
}

enum Outcome {
    Decoded { symbols: usize, objects: usize },
    Failed(MarshalError),
    Skipped,
}

impl ScanCmd {
    pub fn run(self, config: &CliConfig) -> Result<()> {
        let pattern = self
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("Invalid --pattern")?;
        let options = ScanOptions {
            extension: self.ext.clone(),
            pattern,
            recursive: self.recursive,
        };
        let files = scan_dir(&self.dir, &options)?;
        if files.is_empty() {
            println!("No matching files in {}", self.dir.display());
            return Ok(());
        }

        let decoder = MarshalDecoder::with_config(config.decoder.clone());
        let projection = self.json.then(|| config.projection.clone());
        let progress = ProgressBar::new(files.len() as u64, "scan");
        let failed = AtomicBool::new(false);

        let outcomes: Vec<(&PathBuf, Outcome)> = files
            .par_iter()
            .map(|path| {
                if self.fail_fast && failed.load(Ordering::Relaxed) {
                    return (path, Outcome::Skipped);
                }
                let outcome = match check_file(&decoder, projection.as_ref(), path) {
                    Ok((symbols, objects)) => Outcome::Decoded { symbols, objects },
                    Err(e) => {
                        warn!(path = %path.display(), fields = ?e.log_fields(), "decode failed");
                        failed.store(true, Ordering::Relaxed);
                        Outcome::Failed(e)
                    }
                };
                progress.inc(1);
                (path, outcome)
            })
            .collect();

        let mut failures = 0usize;
        let mut skipped = 0usize;
        for (path, outcome) in &outcomes {
            match outcome {
                Outcome::Decoded { symbols, objects } => {
                    println!("ok    {} ({objects} objects, {symbols} symbols)", path.display());
                }
                Outcome::Failed(e) => {
                    failures += 1;
                    println!("FAIL  {}: {e}", path.display());
                }
                Outcome::Skipped => skipped += 1,
            }
        }

        let decoded = outcomes.len() - failures - skipped;
        progress.finish_with_message(format!("{decoded} ok, {failures} failed"));
        println!();
        println!(
            "{} files: {decoded} ok, {failures} failed, {skipped} skipped",
            outcomes.len()
        );

        if failures > 0 {
            return Err(anyhow!("{failures} of {} files failed", outcomes.len()));
        }
        Ok(())
    }
}

/// Decode one file with its own context; returns the table sizes.
fn check_file(
    decoder: &MarshalDecoder,
    projection: Option<&ProjectionConfig>,
    path: &Path,
) -> rbmarshal::Result<(usize, usize)> {
    let graph = decoder.decode_file(path)?;
    if let Some(config) = projection {
        JsonProjector::with_config(&graph, config.clone()).project_root()?;
    }
    Ok((graph.symbols().len(), graph.object_table().len()))
}

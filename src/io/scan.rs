// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data-file discovery.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::{MarshalError, Result as CoreResult};

/// Extension of the data files scanned by default.
pub const DEFAULT_EXTENSION: &str = "rvdata2";

/// Which files a directory scan yields.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// File extension without the dot; empty matches every file
    pub extension: String,
    /// Optional filter on the file name
    pub pattern: Option<Regex>,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            pattern: None,
            recursive: false,
        }
    }
}

impl ScanOptions {
    fn matches(&self, path: &Path) -> bool {
        if !self.extension.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str());
            if !ext.is_some_and(|e| e.eq_ignore_ascii_case(&self.extension)) {
                return false;
            }
        }
        match &self.pattern {
            Some(pattern) => path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| pattern.is_match(name)),
            None => true,
        }
    }
}

/// List matching files under `dir`, sorted by path.
pub fn scan_dir<P: AsRef<Path>>(dir: P, options: &ScanOptions) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(dir.as_ref(), options, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, options: &ScanOptions, out: &mut Vec<PathBuf>) -> CoreResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| MarshalError::Io {
        message: format!("Failed to read directory '{}': {e}", dir.display()),
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if options.recursive {
                collect(&path, options, out)?;
            }
        } else if options.matches(&path) {
            out.push(path);
        }
    }
    Ok(())
}

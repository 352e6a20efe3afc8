// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Memory-mapped byte source for one marshal file.
//!
//! `MarshalSource` owns the mapping; decoded graphs copy what they keep, so
//! the source can be dropped as soon as decoding returns, on success or
//! failure.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rbmarshal::io::MarshalSource;
//! use rbmarshal::marshal::MarshalDecoder;
//!
//! let source = MarshalSource::open("Data/Actors.rvdata2")?;
//! let graph = MarshalDecoder::new().decode(source.data())?;
//! drop(source);
//! println!("{} objects", graph.object_table().len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use crate::core::{MarshalError, Result as CoreResult};

enum Backing {
    Mapped(memmap2::Mmap),
    /// Zero-length files cannot be mapped on every platform.
    Owned(Vec<u8>),
}

/// Scoped byte source backed by a read-only memory map.
pub struct MarshalSource {
    backing: Backing,
    path: String,
}

impl MarshalSource {
    /// Open and map a file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened or mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        let file = File::open(path_ref).map_err(|e| MarshalError::Io {
            message: format!("Failed to open file '{path_str}': {e}"),
        })?;
        let len = file
            .metadata()
            .map_err(|e| MarshalError::Io {
                message: format!("Failed to stat file '{path_str}': {e}"),
            })?
            .len();

        if len == 0 {
            return Ok(Self {
                backing: Backing::Owned(Vec::new()),
                path: path_str,
            });
        }

        // The map is owned by the source and only lent out through `data()`.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| MarshalError::Io {
            message: format!("Failed to mmap file '{path_str}': {e}"),
        })?;

        Ok(Self {
            backing: Backing::Mapped(mmap),
            path: path_str,
        })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>, path: impl Into<String>) -> Self {
        Self {
            backing: Backing::Owned(data.into()),
            path: path.into(),
        }
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the bytes.
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(bytes) => bytes.as_slice(),
        }
    }

    /// Get the length of the data.
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Check if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

impl Deref for MarshalSource {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl fmt::Debug for MarshalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalSource")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("mapped", &matches!(self.backing, Backing::Mapped(_)))
            .finish()
    }
}

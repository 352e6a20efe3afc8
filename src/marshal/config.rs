// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoder configuration.

use serde::{Deserialize, Serialize};

/// Default nesting limit for one decode session.
///
/// Recursion this deep fits a 2 MiB thread stack (rayon workers, test
/// threads) in unoptimized builds.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default cap on up-front collection allocation.
pub const DEFAULT_MAX_PREALLOC: usize = 4096;

/// How the 1-4 byte negative fixnum forms (`0xFF`..`0xFC`) are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixnumSign {
    /// The payload is a magnitude and the control byte negates it.
    #[default]
    Magnitude,
    /// The payload is the low bytes of a sign-extended two's-complement value.
    TwosComplement,
}

/// Configuration for a [`MarshalDecoder`](super::MarshalDecoder).
///
/// # Example
///
/// ```rust
/// use rbmarshal::marshal::DecoderConfig;
///
/// let config = DecoderConfig::new().max_depth(64).max_prealloc(256);
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum nesting depth before decoding fails
    pub max_depth: usize,
    /// Upper bound on capacity reserved from an untrusted count field
    pub max_prealloc: usize,
    /// Interpretation of negative multi-byte fixnums
    pub fixnum_sign: FixnumSign,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_prealloc: DEFAULT_MAX_PREALLOC,
            fixnum_sign: FixnumSign::default(),
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the preallocation cap.
    pub fn max_prealloc(mut self, max_prealloc: usize) -> Self {
        self.max_prealloc = max_prealloc;
        self
    }

    /// Set how negative multi-byte fixnums are read.
    pub fn fixnum_sign(mut self, fixnum_sign: FixnumSign) -> Self {
        self.fixnum_sign = fixnum_sign;
        self
    }
}

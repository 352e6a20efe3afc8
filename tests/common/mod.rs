// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

// ============================================================================
// Stream Builder
// ============================================================================

/// Encode a fixnum payload (no tag byte).
///
/// Negative values wider than one byte are written as magnitudes, which is
/// how the default decoder configuration reads them.
pub fn fixnum_bytes(value: i64) -> Vec<u8> {
    match value {
        0 => vec![0x00],
        1..=122 => vec![(value + 5) as u8],
        -123..=-1 => vec![(value - 5) as i8 as u8],
        _ => {
            let magnitude = value.unsigned_abs();
            let width = (64 - magnitude.leading_zeros() as usize).div_ceil(8);
            assert!(width <= 4, "fixnum payload wider than 4 bytes");
            let control = if value > 0 {
                width as u8
            } else {
                (0x100 - width) as u8
            };
            let mut out = vec![control];
            out.extend_from_slice(&magnitude.to_le_bytes()[..width]);
            out
        }
    }
}

/// Hand-assembles a marshal stream, one tag at a time.
#[derive(Debug, Clone)]
pub struct Stream {
    bytes: Vec<u8>,
}

impl Stream {
    /// Start a stream with the 4.8 signature.
    pub fn new() -> Self {
        Self {
            bytes: vec![0x04, 0x08],
        }
    }

    /// Start a stream with an arbitrary signature.
    pub fn with_signature(major: u8, minor: u8) -> Self {
        Self {
            bytes: vec![major, minor],
        }
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Bare length/count field.
    pub fn len(self, n: i64) -> Self {
        let payload = fixnum_bytes(n);
        self.raw(&payload)
    }

    fn bytes_field(self, data: &[u8]) -> Self {
        self.len(data.len() as i64).raw(data)
    }

    pub fn nil(self) -> Self {
        self.raw(b"0")
    }

    pub fn bool(self, value: bool) -> Self {
        self.raw(if value { b"T" } else { b"F" })
    }

    pub fn fixnum(self, value: i64) -> Self {
        self.raw(b"i").len(value)
    }

    pub fn symbol(self, name: &str) -> Self {
        self.raw(b":").bytes_field(name.as_bytes())
    }

    pub fn symlink(self, index: i64) -> Self {
        self.raw(b";").len(index)
    }

    pub fn link(self, index: i64) -> Self {
        self.raw(b"@").len(index)
    }

    pub fn string(self, text: &str) -> Self {
        self.raw(b"\"").bytes_field(text.as_bytes())
    }

    /// UTF-8 string as the runtime writes it: `I"..."` with `E => true`.
    /// The `E` symbol must not have been written before.
    pub fn utf8_string(self, text: &str) -> Self {
        self.ivar().string(text).len(1).symbol("E").bool(true)
    }

    /// UTF-8 string reusing an `E` symbol already at `e_index`.
    pub fn utf8_string_linked(self, text: &str, e_index: i64) -> Self {
        self.ivar().string(text).len(1).symlink(e_index).bool(true)
    }

    pub fn float(self, text: &str) -> Self {
        self.raw(b"f").bytes_field(text.as_bytes())
    }

    /// Bignum from sign and little-endian magnitude (padded to whole words).
    pub fn bignum(self, negative: bool, magnitude_le: &[u8]) -> Self {
        let mut magnitude = magnitude_le.to_vec();
        if magnitude.len() % 2 == 1 {
            magnitude.push(0);
        }
        self.raw(b"l")
            .raw(if negative { b"-" } else { b"+" })
            .len((magnitude.len() / 2) as i64)
            .raw(&magnitude)
    }

    pub fn array(self, count: i64) -> Self {
        self.raw(b"[").len(count)
    }

    pub fn hash(self, count: i64) -> Self {
        self.raw(b"{").len(count)
    }

    /// Hash with default; the default value follows the entries.
    pub fn hash_with_default(self, count: i64) -> Self {
        self.raw(b"}").len(count)
    }

    /// Ivar wrapper; base value, count and pairs follow.
    pub fn ivar(self) -> Self {
        self.raw(b"I")
    }

    /// Object header; `count` ivar pairs follow.
    pub fn object(self, class: &str, count: i64) -> Self {
        self.raw(b"o").symbol(class).len(count)
    }

    /// Struct header; `count` member pairs follow.
    pub fn structure(self, class: &str, count: i64) -> Self {
        self.raw(b"S").symbol(class).len(count)
    }

    pub fn regexp(self, source: &str, flags: u8) -> Self {
        self.raw(b"/").bytes_field(source.as_bytes()).raw(&[flags])
    }

    pub fn class(self, name: &str) -> Self {
        self.raw(b"c").bytes_field(name.as_bytes())
    }

    pub fn module(self, name: &str) -> Self {
        self.raw(b"m").bytes_field(name.as_bytes())
    }

    /// Extended header; the extended value follows.
    pub fn extended(self, module: &str) -> Self {
        self.raw(b"e").symbol(module)
    }

    /// User-class header; the core-type value follows.
    pub fn user_class(self, class: &str) -> Self {
        self.raw(b"C").symbol(class)
    }

    pub fn user_defined(self, class: &str, data: &[u8]) -> Self {
        self.raw(b"u").symbol(class).bytes_field(data)
    }

    /// User-marshal header; the delegate value follows.
    pub fn user_marshal(self, class: &str) -> Self {
        self.raw(b"U").symbol(class)
    }

    /// Data header; the dumped value follows.
    pub fn data(self, class: &str) -> Self {
        self.raw(b"d").symbol(class)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

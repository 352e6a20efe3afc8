// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Marshal cursor: the format's primitive codecs over a byte slice.
//!
//! Every composite decoder learns its element counts, byte lengths and
//! link indices from the variable-length "fixnum" integer read here.

use byteorder::{ByteOrder, LittleEndian};
use num_bigint::{BigInt, Sign};

use super::config::FixnumSign;
use crate::core::{MarshalError, RbFloat, Result as CoreResult};

/// Cursor over a marshal stream.
///
/// # Example
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use rbmarshal::marshal::MarshalCursor;
///
/// let data = [0x01, 0x0A, 0x0A];
/// let mut cursor = MarshalCursor::new(&data);
/// assert_eq!(cursor.read_fixnum()?, 10);
/// assert_eq!(cursor.read_fixnum()?, 5);
/// # Ok(())
/// # }
/// ```
pub struct MarshalCursor<'a> {
    data: &'a [u8],
    offset: usize,
    fixnum_sign: FixnumSign,
}

impl<'a> MarshalCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            fixnum_sign: FixnumSign::default(),
        }
    }

    /// Set how negative multi-byte fixnums are read.
    pub fn with_fixnum_sign(mut self, fixnum_sign: FixnumSign) -> Self {
        self.fixnum_sign = fixnum_sign;
        self
    }

    /// Get the current position.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Get the remaining bytes available to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Check if at end of buffer.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> CoreResult<u8> {
        let value = self
            .peek_u8()
            .ok_or_else(|| MarshalError::unexpected_eof(1, 0, self.offset))?;
        self.offset += 1;
        Ok(value)
    }

    /// Read a byte slice.
    pub fn read_bytes(&mut self, count: usize) -> CoreResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(MarshalError::unexpected_eof(
                count,
                self.remaining(),
                self.offset,
            ));
        }
        let start = self.offset;
        self.offset += count;
        Ok(&self.data[start..self.offset])
    }

    /// Read a variable-length integer.
    ///
    /// | control byte | meaning |
    /// |---|---|
    /// | `0x00` | 0 |
    /// | `0x01`..`0x04` | 1-4 little-endian payload bytes |
    /// | `0xFF`..`0xFC` | 1-4 payload bytes, negative |
    /// | other `b` (as `i8`) | `b - 5` if positive, `b + 5` if negative |
    pub fn read_fixnum(&mut self) -> CoreResult<i64> {
        let control = self.read_u8()?;
        let value = match control {
            0x00 => 0,
            0x01..=0x04 => self.read_le(control as usize)? as i64,
            0xFC..=0xFF => {
                let width = (0x100 - control as usize) as u32;
                let payload = self.read_le(width as usize)? as i64;
                match self.fixnum_sign {
                    FixnumSign::Magnitude => -payload,
                    FixnumSign::TwosComplement => payload - (1i64 << (8 * width)),
                }
            }
            _ => {
                let small = control as i8 as i64;
                if small > 0 {
                    small - 5
                } else {
                    small + 5
                }
            }
        };
        Ok(value)
    }

    /// Read an unsigned little-endian integer of 1 to 4 bytes.
    fn read_le(&mut self, width: usize) -> CoreResult<u64> {
        let bytes = self.read_bytes(width)?;
        Ok(LittleEndian::read_uint(bytes, width))
    }

    /// Read a count or length field.
    ///
    /// Fails with `LengthExceeded` when the value is negative or larger than
    /// `min_unit` bytes per element allows given the remaining input.
    pub fn read_length(&mut self, min_unit: usize) -> CoreResult<usize> {
        let value = self.read_fixnum()?;
        let remaining = self.remaining();
        if value < 0 || (value as u64).saturating_mul(min_unit as u64) > remaining as u64 {
            return Err(MarshalError::length_exceeded(value, self.offset, remaining));
        }
        Ok(value as usize)
    }

    /// Read a length-prefixed byte string.
    pub fn read_byte_string(&mut self) -> CoreResult<&'a [u8]> {
        let length = self.read_fixnum()?;
        if length < 0 {
            return Err(MarshalError::length_exceeded(
                length,
                self.offset,
                self.remaining(),
            ));
        }
        let length = usize::try_from(length)
            .map_err(|_| MarshalError::length_exceeded(length, self.offset, self.remaining()))?;
        self.read_bytes(length)
    }

    /// Read an arbitrary-precision integer: sign byte, 16-bit word count,
    /// then the little-endian magnitude.
    pub fn read_bignum(&mut self) -> CoreResult<BigInt> {
        let sign_offset = self.offset;
        let sign = match self.read_u8()? {
            b'+' => Sign::Plus,
            b'-' => Sign::Minus,
            other => {
                return Err(MarshalError::InvalidBignumSign {
                    sign: other,
                    offset: sign_offset,
                })
            }
        };
        let words = self.read_fixnum()?;
        if words < 0 {
            return Err(MarshalError::length_exceeded(
                words,
                self.offset,
                self.remaining(),
            ));
        }
        let byte_len = (words as u64).saturating_mul(2);
        if byte_len > self.remaining() as u64 {
            return Err(MarshalError::unexpected_eof(
                byte_len as usize,
                self.remaining(),
                self.offset,
            ));
        }
        let magnitude = self.read_bytes(byte_len as usize)?;
        Ok(BigInt::from_bytes_le(sign, magnitude))
    }

    /// Read a textual float: length-prefixed ASCII, truncated at the first
    /// NUL, parsed as a decimal literal (`inf`, `-inf` and `nan` included).
    pub fn read_float(&mut self) -> CoreResult<RbFloat> {
        let offset = self.offset;
        let raw = self.read_byte_string()?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = std::str::from_utf8(&raw[..end]).map_err(|_| MarshalError::InvalidFloat {
            text: String::from_utf8_lossy(&raw[..end]).into_owned(),
            offset,
        })?;
        let value = text.parse::<f64>().map_err(|_| MarshalError::InvalidFloat {
            text: text.to_string(),
            offset,
        })?;
        Ok(RbFloat {
            value,
            text: text.to_string(),
        })
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for rbmarshal.
//!
//! Every failure is terminal for the decode session that raised it: the
//! marshal format has no resynchronization points, so there is no partial
//! result. Errors carry the byte offset (and, once they reach the top of the
//! decoder, the nesting path) needed to diagnose a corrupt file.

use std::fmt;

/// Which decode-session table a reference index points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTable {
    /// Interned symbols (`;` links)
    Symbol,
    /// Referenceable values (`@` links)
    Object,
}

impl ReferenceTable {
    /// Table name used in messages and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTable::Symbol => "symbol",
            ReferenceTable::Object => "object",
        }
    }
}

/// Errors that can occur while decoding or projecting a marshal stream.
#[derive(Debug, Clone)]
pub enum MarshalError {
    /// The 2-byte format/version marker did not match
    SignatureMismatch {
        /// Expected major/minor bytes
        expected: [u8; 2],
        /// Bytes found at the start of the stream
        found: [u8; 2],
    },

    /// Tag byte with no decoder
    UnsupportedTag {
        /// The tag byte
        tag: u8,
        /// Offset of the tag byte
        offset: usize,
    },

    /// Input ended before a read could be satisfied
    UnexpectedEof {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when error occurred
        offset: usize,
    },

    /// A count or length field that the remaining input cannot satisfy
    LengthExceeded {
        /// Length that was read (negative lengths are reported as-is)
        length: i64,
        /// Position of the data the length applies to
        offset: usize,
        /// Bytes left in the stream
        remaining: usize,
    },

    /// Symbol or object link index out of bounds
    InvalidReference {
        /// Table the index points into
        table: ReferenceTable,
        /// The index read from the stream
        index: i64,
        /// Table length at the time of the lookup
        len: usize,
        /// Offset of the link payload
        offset: usize,
    },

    /// A hash or ivar key position decoded to a value that cannot be a key
    NonHashableKey {
        /// Kind of the offending value
        kind: String,
        /// Offset where the key started
        offset: usize,
    },

    /// A position that requires a specific kind decoded to something else
    UnexpectedValue {
        /// What the position requires
        expected: String,
        /// What was found
        found: String,
        /// Offset where the value started
        offset: usize,
    },

    /// Bignum sign byte was neither `+` nor `-`
    InvalidBignumSign {
        /// The sign byte
        sign: u8,
        /// Offset of the sign byte
        offset: usize,
    },

    /// Float text that does not parse as a decimal literal
    InvalidFloat {
        /// Text after NUL truncation
        text: String,
        /// Offset of the length prefix
        offset: usize,
    },

    /// Nesting deeper than the configured limit
    DepthLimitExceeded {
        /// Configured limit
        limit: usize,
        /// Offset where the limit was hit (0 for projection)
        offset: usize,
    },

    /// Integer does not fit the requested fixed-width type
    NumericRange {
        /// Decimal rendering of the value
        value: String,
        /// Target type name
        target: &'static str,
    },

    /// Projection expanded more nodes than its budget allows
    NodeLimitExceeded {
        /// Configured budget
        limit: usize,
    },

    /// A decode session was started on a context that already holds tables
    ContextReused {
        /// Symbols already in the context
        symbols: usize,
        /// Nodes already in the context
        nodes: usize,
    },

    /// Projection reached a node already on the current path
    CycleDetected {
        /// Object-table index of the node, if it has one
        index: Option<usize>,
    },

    /// A decoded regexp that the `regex` crate cannot compile
    InvalidRegexp {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// I/O failure in the byte source
    Io {
        /// Error message
        message: String,
    },

    /// A decode failure with the nesting path at which it happened
    Decode {
        /// Path from the root, e.g. `$[2].@name`
        path: String,
        /// Underlying error
        cause: Box<MarshalError>,
    },
}

impl MarshalError {
    /// Create a signature mismatch error.
    pub fn signature_mismatch(expected: [u8; 2], found: [u8; 2]) -> Self {
        MarshalError::SignatureMismatch { expected, found }
    }

    /// Create an unsupported tag error.
    pub fn unsupported_tag(tag: u8, offset: usize) -> Self {
        MarshalError::UnsupportedTag { tag, offset }
    }

    /// Create a short read error.
    pub fn unexpected_eof(requested: usize, available: usize, offset: usize) -> Self {
        MarshalError::UnexpectedEof {
            requested,
            available,
            offset,
        }
    }

    /// Create a length exceeded error.
    pub fn length_exceeded(length: i64, offset: usize, remaining: usize) -> Self {
        MarshalError::LengthExceeded {
            length,
            offset,
            remaining,
        }
    }

    /// Create an invalid reference error.
    pub fn invalid_reference(table: ReferenceTable, index: i64, len: usize, offset: usize) -> Self {
        MarshalError::InvalidReference {
            table,
            index,
            len,
            offset,
        }
    }

    /// Create a non-hashable key error.
    pub fn non_hashable_key(kind: impl Into<String>, offset: usize) -> Self {
        MarshalError::NonHashableKey {
            kind: kind.into(),
            offset,
        }
    }

    /// Create an unexpected value error.
    pub fn unexpected_value(
        expected: impl Into<String>,
        found: impl Into<String>,
        offset: usize,
    ) -> Self {
        MarshalError::UnexpectedValue {
            expected: expected.into(),
            found: found.into(),
            offset,
        }
    }

    /// Create a numeric range error.
    pub fn numeric_range(value: impl fmt::Display, target: &'static str) -> Self {
        MarshalError::NumericRange {
            value: value.to_string(),
            target,
        }
    }

    /// Create a depth limit error.
    pub fn depth_limit(limit: usize, offset: usize) -> Self {
        MarshalError::DepthLimitExceeded { limit, offset }
    }

    /// Attach a nesting path to a decode failure.
    ///
    /// Errors that already carry a path are returned unchanged.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            MarshalError::Decode { .. } => self,
            cause => MarshalError::Decode {
                path: path.into(),
                cause: Box::new(cause),
            },
        }
    }

    /// The innermost error, with any path wrapper removed.
    pub fn root_cause(&self) -> &MarshalError {
        match self {
            MarshalError::Decode { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Byte offset associated with the failure, if any.
    pub fn offset(&self) -> Option<usize> {
        match self.root_cause() {
            MarshalError::UnsupportedTag { offset, .. }
            | MarshalError::UnexpectedEof { offset, .. }
            | MarshalError::LengthExceeded { offset, .. }
            | MarshalError::InvalidReference { offset, .. }
            | MarshalError::NonHashableKey { offset, .. }
            | MarshalError::UnexpectedValue { offset, .. }
            | MarshalError::InvalidBignumSign { offset, .. }
            | MarshalError::InvalidFloat { offset, .. }
            | MarshalError::DepthLimitExceeded { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            MarshalError::SignatureMismatch { expected, found } => vec![
                ("expected", hex::encode(expected)),
                ("found", hex::encode(found)),
            ],
            MarshalError::UnsupportedTag { tag, offset } => {
                vec![("tag", format!("0x{tag:02x}")), ("offset", offset.to_string())]
            }
            MarshalError::UnexpectedEof {
                requested,
                available,
                offset,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("offset", offset.to_string()),
            ],
            MarshalError::LengthExceeded {
                length,
                offset,
                remaining,
            } => vec![
                ("length", length.to_string()),
                ("offset", offset.to_string()),
                ("remaining", remaining.to_string()),
            ],
            MarshalError::InvalidReference {
                table,
                index,
                len,
                offset,
            } => vec![
                ("table", table.as_str().to_string()),
                ("index", index.to_string()),
                ("len", len.to_string()),
                ("offset", offset.to_string()),
            ],
            MarshalError::NonHashableKey { kind, offset } => {
                vec![("kind", kind.clone()), ("offset", offset.to_string())]
            }
            MarshalError::UnexpectedValue {
                expected,
                found,
                offset,
            } => vec![
                ("expected", expected.clone()),
                ("found", found.clone()),
                ("offset", offset.to_string()),
            ],
            MarshalError::InvalidBignumSign { sign, offset } => vec![
                ("sign", format!("0x{sign:02x}")),
                ("offset", offset.to_string()),
            ],
            MarshalError::InvalidFloat { text, offset } => {
                vec![("text", text.clone()), ("offset", offset.to_string())]
            }
            MarshalError::DepthLimitExceeded { limit, offset } => {
                vec![("limit", limit.to_string()), ("offset", offset.to_string())]
            }
            MarshalError::NumericRange { value, target } => {
                vec![("value", value.clone()), ("target", target.to_string())]
            }
            MarshalError::NodeLimitExceeded { limit } => vec![("limit", limit.to_string())],
            MarshalError::ContextReused { symbols, nodes } => vec![
                ("symbols", symbols.to_string()),
                ("nodes", nodes.to_string()),
            ],
            MarshalError::CycleDetected { index } => vec![(
                "index",
                index.map_or_else(|| "-".to_string(), |i| i.to_string()),
            )],
            MarshalError::InvalidRegexp { pattern, message } => {
                vec![("pattern", pattern.clone()), ("message", message.clone())]
            }
            MarshalError::Io { message } => vec![("message", message.clone())],
            MarshalError::Decode { path, cause } => {
                let mut fields = vec![("path", path.clone())];
                fields.extend(cause.log_fields());
                fields
            }
        }
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalError::SignatureMismatch { expected, found } => write!(
                f,
                "Signature mismatch: expected {:02x} {:02x}, found {:02x} {:02x}",
                expected[0], expected[1], found[0], found[1]
            ),
            MarshalError::UnsupportedTag { tag, offset } => {
                write!(f, "Unsupported tag 0x{tag:02x} at offset {offset}")
            }
            MarshalError::UnexpectedEof {
                requested,
                available,
                offset,
            } => write!(
                f,
                "Unexpected end of input: requested {requested} bytes at offset {offset}, but only {available} bytes available"
            ),
            MarshalError::LengthExceeded {
                length,
                offset,
                remaining,
            } => write!(
                f,
                "Length {length} at offset {offset} cannot be satisfied ({remaining} bytes remaining)"
            ),
            MarshalError::InvalidReference {
                table,
                index,
                len,
                offset,
            } => write!(
                f,
                "Invalid {} link {index} at offset {offset} (table holds {len} entries)",
                table.as_str()
            ),
            MarshalError::NonHashableKey { kind, offset } => {
                write!(f, "Value of kind '{kind}' at offset {offset} cannot be used as a key")
            }
            MarshalError::UnexpectedValue {
                expected,
                found,
                offset,
            } => write!(f, "Expected {expected} at offset {offset}, found {found}"),
            MarshalError::InvalidBignumSign { sign, offset } => {
                write!(f, "Invalid bignum sign byte 0x{sign:02x} at offset {offset}")
            }
            MarshalError::InvalidFloat { text, offset } => {
                write!(f, "Invalid float literal '{text}' at offset {offset}")
            }
            MarshalError::DepthLimitExceeded { limit, offset } => {
                write!(f, "Nesting depth limit {limit} exceeded at offset {offset}")
            }
            MarshalError::NumericRange { value, target } => {
                write!(f, "Integer {value} is out of range for {target}")
            }
            MarshalError::NodeLimitExceeded { limit } => {
                write!(f, "Projection exceeded the budget of {limit} nodes")
            }
            MarshalError::ContextReused { symbols, nodes } => write!(
                f,
                "Decode context already holds {symbols} symbols and {nodes} nodes from an earlier session"
            ),
            MarshalError::CycleDetected { index: Some(index) } => {
                write!(f, "Cycle detected at object #{index}")
            }
            MarshalError::CycleDetected { index: None } => write!(f, "Cycle detected"),
            MarshalError::InvalidRegexp { pattern, message } => {
                write!(f, "Cannot compile regexp /{pattern}/: {message}")
            }
            MarshalError::Io { message } => write!(f, "I/O error: {message}"),
            MarshalError::Decode { path, cause } => write!(f, "{cause} (at {path})"),
        }
    }
}

// `Decode` already renders its cause, so no source chain is exposed.
impl std::error::Error for MarshalError {}

impl From<std::io::Error> for MarshalError {
    fn from(err: std::io::Error) -> Self {
        MarshalError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for rbmarshal operations.
pub type Result<T> = std::result::Result<T, MarshalError>;

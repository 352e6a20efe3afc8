// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Wire tag bytes.

use std::fmt;

/// Leading byte identifying which variant decoder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Nil = b'0',
    True = b'T',
    False = b'F',
    Fixnum = b'i',
    Symbol = b':',
    SymbolLink = b';',
    ObjectLink = b'@',
    InstanceVariables = b'I',
    Extended = b'e',
    Array = b'[',
    Bignum = b'l',
    Class = b'c',
    Module = b'm',
    Data = b'd',
    Float = b'f',
    Hash = b'{',
    HashWithDefault = b'}',
    Object = b'o',
    Regexp = b'/',
    String = b'"',
    Struct = b'S',
    UserClass = b'C',
    UserDefined = b'u',
    UserMarshal = b'U',
}

impl Tag {
    /// Every defined tag.
    pub const ALL: [Tag; 24] = [
        Tag::Nil,
        Tag::True,
        Tag::False,
        Tag::Fixnum,
        Tag::Symbol,
        Tag::SymbolLink,
        Tag::ObjectLink,
        Tag::InstanceVariables,
        Tag::Extended,
        Tag::Array,
        Tag::Bignum,
        Tag::Class,
        Tag::Module,
        Tag::Data,
        Tag::Float,
        Tag::Hash,
        Tag::HashWithDefault,
        Tag::Object,
        Tag::Regexp,
        Tag::String,
        Tag::Struct,
        Tag::UserClass,
        Tag::UserDefined,
        Tag::UserMarshal,
    ];

    /// Map a wire byte to its tag.
    pub fn from_byte(byte: u8) -> Option<Tag> {
        let tag = match byte {
            b'0' => Tag::Nil,
            b'T' => Tag::True,
            b'F' => Tag::False,
            b'i' => Tag::Fixnum,
            b':' => Tag::Symbol,
            b';' => Tag::SymbolLink,
            b'@' => Tag::ObjectLink,
            b'I' => Tag::InstanceVariables,
            b'e' => Tag::Extended,
            b'[' => Tag::Array,
            b'l' => Tag::Bignum,
            b'c' => Tag::Class,
            b'm' => Tag::Module,
            b'd' => Tag::Data,
            b'f' => Tag::Float,
            b'{' => Tag::Hash,
            b'}' => Tag::HashWithDefault,
            b'o' => Tag::Object,
            b'/' => Tag::Regexp,
            b'"' => Tag::String,
            b'S' => Tag::Struct,
            b'C' => Tag::UserClass,
            b'u' => Tag::UserDefined,
            b'U' => Tag::UserMarshal,
            _ => return None,
        };
        Some(tag)
    }

    /// Wire byte.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether values with this tag occupy an object-table slot.
    ///
    /// Immediates and links never do. An `I` wrapper around a symbol is the
    /// one exception decided by the dispatcher, not by the tag.
    pub fn is_referenceable(self) -> bool {
        !matches!(
            self,
            Tag::Nil
                | Tag::True
                | Tag::False
                | Tag::Fixnum
                | Tag::Symbol
                | Tag::SymbolLink
                | Tag::ObjectLink
        )
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Nil => "nil",
            Tag::True => "true",
            Tag::False => "false",
            Tag::Fixnum => "fixnum",
            Tag::Symbol => "symbol",
            Tag::SymbolLink => "symbol_link",
            Tag::ObjectLink => "object_link",
            Tag::InstanceVariables => "instance",
            Tag::Extended => "extended",
            Tag::Array => "array",
            Tag::Bignum => "bignum",
            Tag::Class => "class",
            Tag::Module => "module",
            Tag::Data => "data",
            Tag::Float => "float",
            Tag::Hash => "hash",
            Tag::HashWithDefault => "hash_with_default",
            Tag::Object => "object",
            Tag::Regexp => "regexp",
            Tag::String => "string",
            Tag::Struct => "struct",
            Tag::UserClass => "user_class",
            Tag::UserDefined => "user_defined",
            Tag::UserMarshal => "user_marshal",
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Tag::from_byte(byte).ok_or(byte)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.as_byte() as char)
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Marshal value type system.
//!
//! A decoded stream is a graph, not a tree. Every position in the graph is a
//! [`Value`]; immediates (nil, booleans, fixnums, symbols) are stored inline,
//! while everything that can be the target of an object link lives in the
//! graph's node arena and is addressed by a [`NodeId`] handle. Two positions
//! that hold the same handle are the same node, which is how shared and
//! self-referential structure survives decoding.
//!
//! # Design Principles
//!
//! - **Handles, not pointers**: back-references are handle copies into the
//!   arena, so cycles need no reference counting or interior mutability
//! - **Owned payloads**: strings keep their raw bytes; text views are
//!   produced on demand
//! - **Canonical keys**: hash keys compare by scalar content
//!   ([`KeyContent`]), never by node identity

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::Serialize;

use super::error::{MarshalError, Result};

/// Handle to a node in a decode session's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to an entry in a decode session's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub(crate) usize);

impl SymbolId {
    /// Returns the symbol-table index (the index a symbol link carries).
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A position in the decoded graph.
///
/// Equality is identity: two `Node` values are equal only when they hold the
/// same handle. Use [`KeyContent`] for content comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Immediate integer; never occupies an object-table slot
    Fixnum(i64),
    /// First occurrence of a symbol
    Symbol(SymbolId),
    /// Later occurrence of a symbol, resolved to the shared table entry
    SymbolLink(SymbolId),
    /// First occurrence of an arena node
    Node(NodeId),
    /// Back-reference to an earlier (or in-progress) node
    ObjectLink(NodeId),
}

impl Value {
    /// Arena handle for `Node` and `ObjectLink` positions.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) | Value::ObjectLink(id) => Some(*id),
            _ => None,
        }
    }

    /// Symbol handle for `Symbol` and `SymbolLink` positions.
    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) | Value::SymbolLink(id) => Some(*id),
            _ => None,
        }
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this position is a back-reference.
    pub fn is_link(&self) -> bool {
        matches!(self, Value::ObjectLink(_) | Value::SymbolLink(_))
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Fixnum payload.
    pub fn as_fixnum(&self) -> Option<i64> {
        match self {
            Value::Fixnum(v) => Some(*v),
            _ => None,
        }
    }

    /// Kind name for immediates; arena positions report `"node"`.
    pub fn immediate_kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
            Value::Fixnum(_) => "fixnum",
            Value::Symbol(_) => "symbol",
            Value::SymbolLink(_) => "symbol_link",
            Value::Node(_) => "node",
            Value::ObjectLink(_) => "object_link",
        }
    }
}

/// Arbitrary-precision integer unifying fixnums and bignums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integer(BigInt);

impl Integer {
    /// Wrap a big integer.
    pub fn new(value: BigInt) -> Self {
        Integer(value)
    }

    /// Borrow the underlying big integer.
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Consume into the underlying big integer.
    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    /// Narrow to `i64`.
    pub fn to_i64(&self) -> Result<i64> {
        self.0
            .to_i64()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "i64"))
    }

    /// Narrow to `u64`.
    pub fn to_u64(&self) -> Result<u64> {
        self.0
            .to_u64()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "u64"))
    }

    /// Narrow to `i32`.
    pub fn to_i32(&self) -> Result<i32> {
        self.0
            .to_i32()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "i32"))
    }

    /// Narrow to `u32`.
    pub fn to_u32(&self) -> Result<u32> {
        self.0
            .to_u32()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "u32"))
    }

    /// Narrow to `i16`.
    pub fn to_i16(&self) -> Result<i16> {
        self.0
            .to_i16()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "i16"))
    }

    /// Narrow to `u16`.
    pub fn to_u16(&self) -> Result<u16> {
        self.0
            .to_u16()
            .ok_or_else(|| MarshalError::numeric_range(&self.0, "u16"))
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Integer(BigInt::from(value))
    }
}

impl From<BigInt> for Integer {
    fn from(value: BigInt) -> Self {
        Integer(value)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Byte string as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RbString {
    bytes: Vec<u8>,
}

impl RbString {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bytes as UTF-8, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// The bytes as text, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Interned identifier from the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RbSymbol {
    name: RbString,
}

impl RbSymbol {
    /// Create a symbol from its raw name bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: RbString::new(bytes),
        }
    }

    /// Raw name bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.name.as_bytes()
    }

    /// Symbol name as text.
    pub fn name(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }
}

/// Float with the text it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct RbFloat {
    /// Parsed value
    pub value: f64,
    /// Wire text after NUL truncation (`"1.5"`, `"inf"`, `"nan"`, ...)
    pub text: String,
}

/// Regexp option bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexpFlags(u8);

impl RegexpFlags {
    /// Bit 0: case-insensitive.
    pub const IGNORE_CASE: u8 = 0x01;
    /// Bit 1: extended (whitespace-insensitive).
    pub const EXTENDED: u8 = 0x02;
    /// Bit 2: multiline (dot matches newline).
    pub const MULTILINE: u8 = 0x04;

    /// Wrap a raw flags byte.
    pub fn from_bits(bits: u8) -> Self {
        RegexpFlags(bits)
    }

    /// Raw flags byte, including encoding bits above bit 2.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Case-insensitive matching.
    pub fn ignore_case(self) -> bool {
        self.0 & Self::IGNORE_CASE != 0
    }

    /// Whitespace-insensitive pattern.
    pub fn extended(self) -> bool {
        self.0 & Self::EXTENDED != 0
    }

    /// Dot matches newline.
    pub fn multiline(self) -> bool {
        self.0 & Self::MULTILINE != 0
    }
}

impl fmt::Display for RegexpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiline() {
            f.write_str("m")?;
        }
        if self.ignore_case() {
            f.write_str("i")?;
        }
        if self.extended() {
            f.write_str("x")?;
        }
        Ok(())
    }
}

/// Regular expression source and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbRegexp {
    /// Pattern bytes
    pub source: RbString,
    /// Option bits
    pub flags: RegexpFlags,
}

impl RbRegexp {
    /// Compile the pattern with the `regex` crate.
    ///
    /// Only the syntax shared by both engines is supported; patterns using
    /// backreferences or lookaround fail with `InvalidRegexp`.
    pub fn to_regex(&self) -> Result<regex::Regex> {
        let pattern = self.source.to_string_lossy();
        regex::RegexBuilder::new(&pattern)
            .case_insensitive(self.flags.ignore_case())
            .ignore_whitespace(self.flags.extended())
            .dot_matches_new_line(self.flags.multiline())
            .build()
            .map_err(|e| MarshalError::InvalidRegexp {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }
}

/// Canonical scalar content of a hashable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyContent {
    /// Fixnum or bignum value
    Integer(BigInt),
    /// String bytes
    Bytes(Vec<u8>),
    /// Symbol name bytes
    Symbol(Vec<u8>),
}

impl KeyContent {
    /// Key for a string.
    pub fn string(text: impl AsRef<[u8]>) -> Self {
        KeyContent::Bytes(text.as_ref().to_vec())
    }

    /// Key for a symbol.
    pub fn symbol(name: impl AsRef<[u8]>) -> Self {
        KeyContent::Symbol(name.as_ref().to_vec())
    }

    /// Key for an integer.
    pub fn integer(value: impl Into<BigInt>) -> Self {
        KeyContent::Integer(value.into())
    }

    /// Text rendering used for JSON object keys.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            KeyContent::Integer(v) => Cow::Owned(v.to_string()),
            KeyContent::Bytes(b) | KeyContent::Symbol(b) => String::from_utf8_lossy(b),
        }
    }
}

impl fmt::Display for KeyContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyContent::Symbol(_) => write!(f, ":{}", self.to_text()),
            KeyContent::Bytes(_) => write!(f, "{:?}", self.to_text()),
            KeyContent::Integer(v) => write!(f, "{v}"),
        }
    }
}

/// A hash or ivar key: the decoded position plus its canonical content.
///
/// Equality and hashing use the content only.
#[derive(Debug, Clone)]
pub struct HashKey {
    value: Value,
    content: KeyContent,
}

impl HashKey {
    pub(crate) fn new(value: Value, content: KeyContent) -> Self {
        Self { value, content }
    }

    /// The key as it was decoded.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical content.
    pub fn content(&self) -> &KeyContent {
        &self.content
    }
}

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
    }
}

impl indexmap::Equivalent<HashKey> for KeyContent {
    fn equivalent(&self, key: &HashKey) -> bool {
        *self == key.content
    }
}

/// Ordered named fields (ivars, struct members).
pub type RbFields = IndexMap<HashKey, Value>;

/// Look up a field by symbol name.
pub fn field<'a>(fields: &'a RbFields, name: &str) -> Option<&'a Value> {
    fields.get(&KeyContent::symbol(name))
}

/// Hash, optionally with a default value.
#[derive(Debug, Clone, Default)]
pub struct RbHash {
    /// Entries in stream order
    pub entries: IndexMap<HashKey, Value>,
    /// Default returned for absent keys (`}` hashes)
    pub default: Option<Value>,
}

impl RbHash {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the hash has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, falling back to the default value.
    pub fn get(&self, key: &KeyContent) -> Option<&Value> {
        self.entries.get(key).or(self.default.as_ref())
    }

    /// Look up a string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.get(&KeyContent::string(key))
    }

    /// Look up a symbol key.
    pub fn get_symbol(&self, name: &str) -> Option<&Value> {
        self.get(&KeyContent::symbol(name))
    }

    /// Look up an integer key.
    pub fn get_int(&self, key: i64) -> Option<&Value> {
        self.get(&KeyContent::integer(key))
    }

    /// Iterate entries in stream order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, HashKey, Value> {
        self.entries.iter()
    }
}

/// Object or struct: class name plus named fields.
#[derive(Debug, Clone)]
pub struct RbObject {
    /// Class name
    pub class: SymbolId,
    /// Ivars (objects) or members (structs)
    pub fields: RbFields,
}

impl RbObject {
    /// Look up a field by name (`"@hp"` for ivars, `"x"` for struct members).
    pub fn get(&self, name: &str) -> Option<&Value> {
        field(&self.fields, name)
    }
}

/// A value decorated with ivars, usually an encoding marker.
#[derive(Debug, Clone)]
pub struct RbInstance {
    /// Wrapped value
    pub base: Value,
    /// Attached ivars
    pub fields: RbFields,
}

impl RbInstance {
    /// Look up an attached ivar by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        field(&self.fields, name)
    }

    /// Check if every attached ivar is an encoding marker.
    pub fn has_only_encoding(&self) -> bool {
        !self.fields.is_empty()
            && self.fields.keys().all(|k| {
                matches!(k.content(), KeyContent::Symbol(name) if name == b"E" || name == b"encoding")
            })
    }
}

/// Instance of a user subclass of a core type.
#[derive(Debug, Clone)]
pub struct RbUserClass {
    /// Subclass name
    pub class: SymbolId,
    /// Core-type value
    pub base: Value,
}

/// Opaque `_dump` payload.
#[derive(Debug, Clone)]
pub struct RbUserDefined {
    /// Class name
    pub class: SymbolId,
    /// Uninterpreted bytes
    pub data: Vec<u8>,
}

/// `marshal_dump` substitute value.
#[derive(Debug, Clone)]
pub struct RbUserMarshal {
    /// Class name
    pub class: SymbolId,
    /// Delegate value
    pub value: Value,
}

/// Value extended with a module.
#[derive(Debug, Clone)]
pub struct RbExtended {
    /// Module name
    pub module: SymbolId,
    /// Extended value
    pub base: Value,
}

/// Typed-data object with its `_dump_data` value.
#[derive(Debug, Clone)]
pub struct RbData {
    /// Class name
    pub class: SymbolId,
    /// Dumped state
    pub value: Value,
}

/// Arena node: a referenceable value.
#[derive(Debug, Clone)]
pub enum Node {
    /// Slot reserved for a value whose fields are still being decoded
    Pending,
    Float(RbFloat),
    Bignum(Integer),
    String(RbString),
    Regexp(RbRegexp),
    Array(Vec<Value>),
    /// Plain hash (`{`) or hash with default (`}`)
    Hash(RbHash),
    Object(RbObject),
    Struct(RbObject),
    /// Instance-variable wrapper (`I`)
    Instance(RbInstance),
    /// Class reference by name
    Class(String),
    /// Module reference by name
    Module(String),
    UserClass(RbUserClass),
    UserDefined(RbUserDefined),
    UserMarshal(RbUserMarshal),
    Extended(RbExtended),
    Data(RbData),
}

impl Node {
    /// Kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Pending => "pending",
            Node::Float(_) => "float",
            Node::Bignum(_) => "bignum",
            Node::String(_) => "string",
            Node::Regexp(_) => "regexp",
            Node::Array(_) => "array",
            Node::Hash(h) if h.default.is_some() => "hash_with_default",
            Node::Hash(_) => "hash",
            Node::Object(_) => "object",
            Node::Struct(_) => "struct",
            Node::Instance(_) => "instance",
            Node::Class(_) => "class",
            Node::Module(_) => "module",
            Node::UserClass(_) => "user_class",
            Node::UserDefined(_) => "user_defined",
            Node::UserMarshal(_) => "user_marshal",
            Node::Extended(_) => "extended",
            Node::Data(_) => "data",
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get a mutable reference to the inner array.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get the inner hash.
    pub fn as_hash(&self) -> Option<&RbHash> {
        match self {
            Node::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Try to get a mutable reference to the inner hash.
    pub fn as_hash_mut(&mut self) -> Option<&mut RbHash> {
        match self {
            Node::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Try to get the inner object or struct.
    pub fn as_object(&self) -> Option<&RbObject> {
        match self {
            Node::Object(o) | Node::Struct(o) => Some(o),
            _ => None,
        }
    }

    /// Try to get the inner string.
    pub fn as_string(&self) -> Option<&RbString> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Node::Float(f) => Some(f.value),
            _ => None,
        }
    }

    /// Try to get the inner regexp.
    pub fn as_regexp(&self) -> Option<&RbRegexp> {
        match self {
            Node::Regexp(r) => Some(r),
            _ => None,
        }
    }

    /// Try to get the instance-variable wrapper.
    pub fn as_instance(&self) -> Option<&RbInstance> {
        match self {
            Node::Instance(i) => Some(i),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_hash_key_compares_content_not_identity() {
        let a = HashKey::new(Value::Node(NodeId(1)), KeyContent::string("hp"));
        let b = HashKey::new(Value::Node(NodeId(7)), KeyContent::string("hp"));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_string_and_symbol_keys_differ() {
        assert_ne!(KeyContent::string("a"), KeyContent::symbol("a"));
    }

    #[test]
    fn test_integer_narrowing() {
        let small = Integer::from(70_000);
        assert_eq!(small.to_i32().unwrap(), 70_000);
        assert_eq!(small.to_u32().unwrap(), 70_000);
        let err = small.to_u16().unwrap_err();
        assert!(matches!(err, MarshalError::NumericRange { target: "u16", .. }));
        assert!(Integer::from(-1).to_u64().is_err());
        assert_eq!(Integer::from(-300).to_i16().unwrap(), -300);
    }

    #[test]
    fn test_hash_default_fallback() {
        let mut hash = RbHash::default();
        hash.entries.insert(
            HashKey::new(Value::Fixnum(1), KeyContent::integer(1)),
            Value::Bool(true),
        );
        assert_eq!(hash.get_int(1), Some(&Value::Bool(true)));
        assert_eq!(hash.get_int(2), None);

        hash.default = Some(Value::Fixnum(0));
        assert_eq!(hash.get_int(2), Some(&Value::Fixnum(0)));
        assert_eq!(hash.get_int(1), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_regexp_flags() {
        let flags = RegexpFlags::from_bits(0x07 | 0x10);
        assert!(flags.ignore_case());
        assert!(flags.extended());
        assert!(flags.multiline());
        assert_eq!(flags.bits(), 0x17);
        assert_eq!(flags.to_string(), "mix");
        assert_eq!(RegexpFlags::default().to_string(), "");
    }

    #[test]
    fn test_regexp_compiles_with_flags() {
        let re = RbRegexp {
            source: RbString::new("ab c"),
            flags: RegexpFlags::from_bits(RegexpFlags::IGNORE_CASE | RegexpFlags::EXTENDED),
        };
        let compiled = re.to_regex().unwrap();
        assert!(compiled.is_match("xxABCxx"));
    }

    #[test]
    fn test_regexp_compile_error() {
        let re = RbRegexp {
            source: RbString::new("(unclosed"),
            flags: RegexpFlags::default(),
        };
        assert!(matches!(
            re.to_regex(),
            Err(MarshalError::InvalidRegexp { .. })
        ));
    }

    #[test]
    fn test_instance_encoding_only() {
        let mut fields = RbFields::new();
        fields.insert(
            HashKey::new(Value::Symbol(SymbolId(0)), KeyContent::symbol("E")),
            Value::Bool(true),
        );
        let inst = RbInstance {
            base: Value::Node(NodeId(0)),
            fields,
        };
        assert!(inst.has_only_encoding());
        assert_eq!(inst.get("E"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_rb_string_text_views() {
        let s = RbString::new(vec![0x68, 0x69, 0xff]);
        assert_eq!(s.as_str(), None);
        assert_eq!(s.to_string_lossy(), "hi\u{fffd}");
        assert_eq!(RbString::new("ok").as_str(), Some("ok"));
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Marshal stream decoder.
//!
//! [`MarshalDecoder`] checks the version marker, then reads one root value
//! by recursive tag dispatch. Each referenceable value reserves its arena
//! slot (and object-table index) before its nested values are read, so
//! back-references inside a value resolve to the value itself.
//!
//! # Example
//!
//! ```rust
//! use rbmarshal::marshal::MarshalDecoder;
//!
//! // [1, :a]
//! let bytes = [0x04, 0x08, b'[', 0x07, b'i', 0x06, b':', 0x06, b'a'];
//! let graph = MarshalDecoder::new().decode(&bytes).unwrap();
//! let items = graph.array(graph.root()).unwrap();
//! assert_eq!(items[0].as_fixnum(), Some(1));
//! assert_eq!(graph.symbol_of(&items[1]).unwrap().name(), "a");
//! ```

use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::config::DecoderConfig;
use super::context::{DecodeContext, PathSegment};
use super::cursor::MarshalCursor;
use super::tag::Tag;
use crate::core::{
    HashKey, Integer, KeyContent, MarshalError, MarshalGraph, Node, RbData, RbExtended, RbFields,
    RbHash, RbInstance, RbObject, RbRegexp, RbString, RbSymbol, RbUserClass, RbUserDefined,
    RbUserMarshal, RegexpFlags, Result as CoreResult, SymbolId, Value,
};
use crate::io::MarshalSource;

/// Major version byte.
pub const MARSHAL_MAJOR: u8 = 4;

/// Minor version byte.
pub const MARSHAL_MINOR: u8 = 8;

/// Stream signature.
pub const SIGNATURE: [u8; 2] = [MARSHAL_MAJOR, MARSHAL_MINOR];

/// Decoder for marshal 4.8 streams.
///
/// The decoder itself holds only configuration and may be shared freely;
/// every call creates its own [`DecodeContext`].
#[derive(Debug, Clone, Default)]
pub struct MarshalDecoder {
    config: DecoderConfig,
}

impl MarshalDecoder {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with the given configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a complete stream into a graph.
    pub fn decode(&self, data: &[u8]) -> CoreResult<MarshalGraph> {
        let mut ctx = DecodeContext::new(&self.config);
        let root = self.decode_with_context(data, &mut ctx)?;
        Ok(ctx.into_graph(root))
    }

    /// Read a byte source to the end and decode it.
    pub fn decode_reader<R: Read>(&self, mut reader: R) -> CoreResult<MarshalGraph> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.decode(&data)
    }

    /// Memory-map a file and decode it.
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<MarshalGraph> {
        let source = MarshalSource::open(path)?;
        debug!(path = source.path(), len = source.len(), "decoding file");
        self.decode(source.data())
    }

    /// Decode the root value into a caller-owned context.
    ///
    /// The context must be fresh: one that already holds symbols or nodes
    /// is rejected with `ContextReused`, so links can never resolve into an
    /// earlier session's tables. On a signature mismatch nothing is added
    /// to the tables. Bytes after the root value are ignored.
    pub fn decode_with_context(&self, data: &[u8], ctx: &mut DecodeContext) -> CoreResult<Value> {
        if !ctx.is_fresh() {
            return Err(MarshalError::ContextReused {
                symbols: ctx.symbol_count(),
                nodes: ctx.node_count(),
            });
        }
        let mut cursor = MarshalCursor::new(data).with_fixnum_sign(self.config.fixnum_sign);
        Self::read_signature(&mut cursor)?;

        debug!(len = data.len(), "decoding marshal stream");
        let root = self
            .read_value(&mut cursor, ctx, true)
            .map_err(|e| e.with_path(ctx.path_string()))?;

        if !cursor.is_at_end() {
            debug!(
                trailing = cursor.remaining(),
                offset = cursor.position(),
                "ignoring bytes after root value"
            );
        }
        debug!(
            symbols = ctx.symbol_count(),
            objects = ctx.object_count(),
            nodes = ctx.node_count(),
            "decoded marshal stream"
        );
        Ok(root)
    }

    fn read_signature(cursor: &mut MarshalCursor<'_>) -> CoreResult<()> {
        let bytes = cursor.read_bytes(2)?;
        let found = [bytes[0], bytes[1]];
        if found != SIGNATURE {
            return Err(MarshalError::signature_mismatch(SIGNATURE, found));
        }
        Ok(())
    }

    /// Read one tagged value.
    ///
    /// `register` is false only for the wrapped value of `I`, `e` and `C`,
    /// whose slot in the object table belongs to the wrapper.
    fn read_value(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
        register: bool,
    ) -> CoreResult<Value> {
        let offset = cursor.position();
        let byte = cursor.read_u8()?;
        self.dispatch(byte, offset, cursor, ctx, register)
    }

    fn dispatch(
        &self,
        byte: u8,
        offset: usize,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
        register: bool,
    ) -> CoreResult<Value> {
        let tag = Tag::from_byte(byte).ok_or_else(|| MarshalError::unsupported_tag(byte, offset))?;
        let register = register && tag.is_referenceable();
        trace!(tag = tag.name(), offset, register, "dispatch");
        ctx.enter(offset)?;

        let value = match tag {
            Tag::Nil => Value::Nil,
            Tag::True => Value::Bool(true),
            Tag::False => Value::Bool(false),
            Tag::Fixnum => Value::Fixnum(cursor.read_fixnum()?),
            Tag::Symbol => Value::Symbol(Self::read_symbol(cursor, ctx)?),
            Tag::SymbolLink => {
                let at = cursor.position();
                let index = cursor.read_fixnum()?;
                Value::SymbolLink(ctx.resolve_symbol(index, at)?)
            }
            Tag::ObjectLink => {
                let at = cursor.position();
                let index = cursor.read_fixnum()?;
                Value::ObjectLink(ctx.resolve_object(index, at)?)
            }
            Tag::InstanceVariables if matches!(cursor.peek_u8(), Some(b':' | b';')) => {
                self.read_symbol_with_ivars(cursor, ctx)?
            }
            Tag::InstanceVariables => {
                Self::with_slot(ctx, register, |ctx| self.read_instance(cursor, ctx))?
            }
            Tag::Extended => Self::with_slot(ctx, register, |ctx| self.read_extended(cursor, ctx))?,
            Tag::Array => Self::with_slot(ctx, register, |ctx| self.read_array(cursor, ctx))?,
            Tag::Bignum => Self::with_slot(ctx, register, |_| {
                Ok(Node::Bignum(Integer::new(cursor.read_bignum()?)))
            })?,
            Tag::Class => Self::with_slot(ctx, register, |_| {
                Ok(Node::Class(Self::read_name(cursor)?))
            })?,
            Tag::Module => Self::with_slot(ctx, register, |_| {
                Ok(Node::Module(Self::read_name(cursor)?))
            })?,
            Tag::Data => Self::with_slot(ctx, register, |ctx| self.read_data(cursor, ctx))?,
            Tag::Float => {
                Self::with_slot(ctx, register, |_| Ok(Node::Float(cursor.read_float()?)))?
            }
            Tag::Hash => Self::with_slot(ctx, register, |ctx| self.read_hash(cursor, ctx, false))?,
            Tag::HashWithDefault => {
                Self::with_slot(ctx, register, |ctx| self.read_hash(cursor, ctx, true))?
            }
            Tag::Object => Self::with_slot(ctx, register, |ctx| {
                Ok(Node::Object(self.read_object(cursor, ctx)?))
            })?,
            Tag::Regexp => Self::with_slot(ctx, register, |_| Self::read_regexp(cursor))?,
            Tag::String => Self::with_slot(ctx, register, |_| {
                Ok(Node::String(RbString::new(cursor.read_byte_string()?)))
            })?,
            Tag::Struct => Self::with_slot(ctx, register, |ctx| {
                Ok(Node::Struct(self.read_object(cursor, ctx)?))
            })?,
            Tag::UserClass => {
                Self::with_slot(ctx, register, |ctx| self.read_user_class(cursor, ctx))?
            }
            Tag::UserDefined => {
                Self::with_slot(ctx, register, |ctx| self.read_user_defined(cursor, ctx))?
            }
            Tag::UserMarshal => {
                Self::with_slot(ctx, register, |ctx| self.read_user_marshal(cursor, ctx))?
            }
        };

        ctx.leave();
        Ok(value)
    }

    /// Reserve a slot, decode the node, then fill the slot.
    fn with_slot<F>(ctx: &mut DecodeContext, register: bool, decode: F) -> CoreResult<Value>
    where
        F: FnOnce(&mut DecodeContext) -> CoreResult<Node>,
    {
        let id = ctx.reserve(register);
        let node = decode(ctx)?;
        ctx.finalize(id, node);
        Ok(Value::Node(id))
    }

    fn read_symbol(cursor: &mut MarshalCursor<'_>, ctx: &mut DecodeContext) -> CoreResult<SymbolId> {
        let name = cursor.read_byte_string()?;
        Ok(ctx.intern_symbol(RbSymbol::new(name)))
    }

    /// `I` around a symbol: the symbol keeps no object slot and the
    /// encoding ivars that follow are consumed and dropped.
    fn read_symbol_with_ivars(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Value> {
        ctx.push_path(PathSegment::Base);
        let symbol = self.read_value(cursor, ctx, false)?;
        ctx.pop_path();
        let dropped = self.read_fields(cursor, ctx)?;
        trace!(ivars = dropped.len(), "dropped symbol ivars");
        Ok(symbol)
    }

    fn read_name(cursor: &mut MarshalCursor<'_>) -> CoreResult<String> {
        Ok(String::from_utf8_lossy(cursor.read_byte_string()?).into_owned())
    }

    /// Read a position that must hold a class or module name.
    fn read_class_name(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<SymbolId> {
        let offset = cursor.position();
        ctx.push_path(PathSegment::Class);
        let value = self.read_value(cursor, ctx, true)?;
        let id = value.symbol_id().ok_or_else(|| {
            MarshalError::unexpected_value("symbol", value_kind(ctx, &value), offset)
        })?;
        ctx.pop_path();
        Ok(id)
    }

    /// Read a key and compute its canonical content.
    fn read_key(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
        index: usize,
    ) -> CoreResult<HashKey> {
        let offset = cursor.position();
        ctx.push_path(PathSegment::Key(index));
        let value = self.read_value(cursor, ctx, true)?;
        let content = key_content(ctx, &value)
            .ok_or_else(|| MarshalError::non_hashable_key(value_kind(ctx, &value), offset))?;
        ctx.pop_path();
        Ok(HashKey::new(value, content))
    }

    /// Read `count` (name, value) pairs. Used for ivars and struct members.
    fn read_fields(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<RbFields> {
        let count = cursor.read_length(2)?;
        let mut fields = RbFields::with_capacity(count.min(self.config.max_prealloc));
        for i in 0..count {
            let key = self.read_key(cursor, ctx, i)?;
            ctx.push_path(PathSegment::Field(key.content().to_text().into_owned()));
            let value = self.read_value(cursor, ctx, true)?;
            ctx.pop_path();
            fields.insert(key, value);
        }
        Ok(fields)
    }

    fn read_array(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let count = cursor.read_length(1)?;
        let mut items = Vec::with_capacity(count.min(self.config.max_prealloc));
        for i in 0..count {
            ctx.push_path(PathSegment::Index(i));
            items.push(self.read_value(cursor, ctx, true)?);
            ctx.pop_path();
        }
        Ok(Node::Array(items))
    }

    fn read_hash(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
        with_default: bool,
    ) -> CoreResult<Node> {
        let count = cursor.read_length(2)?;
        let mut entries = IndexMap::with_capacity(count.min(self.config.max_prealloc));
        for i in 0..count {
            let key = self.read_key(cursor, ctx, i)?;
            ctx.push_path(PathSegment::Entry(key.content().to_string()));
            let value = self.read_value(cursor, ctx, true)?;
            ctx.pop_path();
            // Duplicate keys keep the first position and the last value.
            entries.insert(key, value);
        }

        let default = if with_default {
            ctx.push_path(PathSegment::Default);
            let value = self.read_value(cursor, ctx, true)?;
            ctx.pop_path();
            Some(value)
        } else {
            None
        };

        Ok(Node::Hash(RbHash { entries, default }))
    }

    fn read_object(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<RbObject> {
        let class = self.read_class_name(cursor, ctx)?;
        let fields = self.read_fields(cursor, ctx)?;
        Ok(RbObject { class, fields })
    }

    fn read_instance(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        ctx.push_path(PathSegment::Base);
        let base = self.read_value(cursor, ctx, false)?;
        ctx.pop_path();
        let fields = self.read_fields(cursor, ctx)?;
        Ok(Node::Instance(RbInstance { base, fields }))
    }

    fn read_regexp(cursor: &mut MarshalCursor<'_>) -> CoreResult<Node> {
        let source = RbString::new(cursor.read_byte_string()?);
        let flags = RegexpFlags::from_bits(cursor.read_u8()?);
        Ok(Node::Regexp(RbRegexp { source, flags }))
    }

    fn read_extended(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let module = self.read_class_name(cursor, ctx)?;
        ctx.push_path(PathSegment::Base);
        let base = self.read_value(cursor, ctx, false)?;
        ctx.pop_path();
        Ok(Node::Extended(RbExtended { module, base }))
    }

    fn read_user_class(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let class = self.read_class_name(cursor, ctx)?;
        ctx.push_path(PathSegment::Base);
        let base = self.read_value(cursor, ctx, false)?;
        ctx.pop_path();
        Ok(Node::UserClass(RbUserClass { class, base }))
    }

    fn read_user_defined(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let class = self.read_class_name(cursor, ctx)?;
        let data = cursor.read_byte_string()?.to_vec();
        Ok(Node::UserDefined(RbUserDefined { class, data }))
    }

    fn read_user_marshal(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let class = self.read_class_name(cursor, ctx)?;
        ctx.push_path(PathSegment::Payload);
        let value = self.read_value(cursor, ctx, true)?;
        ctx.pop_path();
        Ok(Node::UserMarshal(RbUserMarshal { class, value }))
    }

    fn read_data(
        &self,
        cursor: &mut MarshalCursor<'_>,
        ctx: &mut DecodeContext,
    ) -> CoreResult<Node> {
        let class = self.read_class_name(cursor, ctx)?;
        ctx.push_path(PathSegment::Payload);
        let value = self.read_value(cursor, ctx, true)?;
        ctx.pop_path();
        Ok(Node::Data(RbData { class, value }))
    }
}

/// Canonical content of a key position, or `None` if the value is not
/// hashable. Links are followed; a link to a node still being decoded is
/// not hashable.
fn key_content(ctx: &DecodeContext, value: &Value) -> Option<KeyContent> {
    match value {
        Value::Fixnum(v) => Some(KeyContent::integer(*v)),
        Value::Symbol(id) | Value::SymbolLink(id) => {
            Some(KeyContent::symbol(ctx.symbol(*id).as_bytes()))
        }
        Value::Node(id) | Value::ObjectLink(id) => match ctx.node(*id) {
            Node::String(s) => Some(KeyContent::string(s.as_bytes())),
            Node::Bignum(i) => Some(KeyContent::Integer(i.as_bigint().clone())),
            Node::Instance(inst) => key_content(ctx, &inst.base),
            _ => None,
        },
        Value::Nil | Value::Bool(_) => None,
    }
}

fn value_kind(ctx: &DecodeContext, value: &Value) -> &'static str {
    match value.node_id() {
        Some(id) => ctx.node(id).kind(),
        None => value.immediate_kind(),
    }
}

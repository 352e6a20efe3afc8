// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded object graph.
//!
//! [`MarshalGraph`] is what one decode session leaves behind: the symbol
//! table, the node arena, the object reference table (link index to node),
//! and the root position. All accessors follow links, so callers never need
//! to distinguish a first occurrence from a back-reference.

use std::borrow::Cow;

use super::value::{
    Integer, Node, NodeId, RbHash, RbObject, RbString, RbSymbol, SymbolId, Value,
};

/// The result of decoding one marshal stream.
#[derive(Debug, Clone)]
pub struct MarshalGraph {
    pub(crate) symbols: Vec<RbSymbol>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) objects: Vec<NodeId>,
    pub(crate) root: Value,
}

impl MarshalGraph {
    /// Top-level value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Symbol table in stream order.
    pub fn symbols(&self) -> &[RbSymbol] {
        &self.symbols
    }

    /// Object reference table: entry `i` is the node an `@i` link resolves to.
    pub fn object_table(&self) -> &[NodeId] {
        &self.objects
    }

    /// Number of arena nodes, including ones that occupy no reference slot.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All arena nodes with their handles, in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Get a symbol by handle.
    pub fn symbol(&self, id: SymbolId) -> &RbSymbol {
        &self.symbols[id.0]
    }

    /// Symbol name by handle.
    pub fn symbol_name(&self, id: SymbolId) -> Cow<'_, str> {
        self.symbol(id).name()
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a node for in-place editing.
    ///
    /// Every position holding `id` observes the change.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Object-table index of a node, if it occupies a reference slot.
    pub fn object_index(&self, id: NodeId) -> Option<usize> {
        // Slots are reserved in arena order, so the table is sorted.
        self.objects.binary_search(&id).ok()
    }

    /// Follow a `Node`/`ObjectLink` position to its node.
    pub fn resolve(&self, value: &Value) -> Option<&Node> {
        value.node_id().map(|id| self.node(id))
    }

    /// Strip instance-variable, extended and user-class wrappers.
    pub fn unwrap<'a>(&'a self, value: &'a Value) -> &'a Value {
        let mut current = value;
        loop {
            match self.resolve(current) {
                Some(Node::Instance(inst)) => current = &inst.base,
                Some(Node::Extended(ext)) => current = &ext.base,
                Some(Node::UserClass(uc)) => current = &uc.base,
                _ => return current,
            }
        }
    }

    /// Kind name of any position, following links.
    pub fn kind(&self, value: &Value) -> &'static str {
        match (self.resolve(value), value) {
            (Some(node), _) => node.kind(),
            (None, Value::SymbolLink(_)) => "symbol",
            (None, _) => value.immediate_kind(),
        }
    }

    /// Check if two positions refer to the same node (or the same symbol).
    pub fn same(&self, a: &Value, b: &Value) -> bool {
        match (a.node_id(), b.node_id()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.symbol_id(), b.symbol_id()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Symbol at a position.
    pub fn symbol_of(&self, value: &Value) -> Option<&RbSymbol> {
        value.symbol_id().map(|id| self.symbol(id))
    }

    /// Integer at a position (fixnum or bignum).
    pub fn integer(&self, value: &Value) -> Option<Integer> {
        match value {
            Value::Fixnum(v) => Some(Integer::from(*v)),
            _ => match self.resolve(value)? {
                Node::Bignum(big) => Some(big.clone()),
                _ => None,
            },
        }
    }

    /// Float at a position.
    pub fn float(&self, value: &Value) -> Option<f64> {
        self.resolve(value)?.as_float()
    }

    /// String at a position, looking through wrappers.
    pub fn string(&self, value: &Value) -> Option<&RbString> {
        self.resolve(self.unwrap(value))?.as_string()
    }

    /// Text of a string or symbol position.
    pub fn text(&self, value: &Value) -> Option<Cow<'_, str>> {
        if let Some(sym) = self.symbol_of(value) {
            return Some(sym.name());
        }
        self.string(value).map(RbString::to_string_lossy)
    }

    /// Array elements at a position, looking through wrappers.
    pub fn array(&self, value: &Value) -> Option<&[Value]> {
        self.resolve(self.unwrap(value))?.as_array()
    }

    /// Hash at a position, looking through wrappers.
    pub fn hash(&self, value: &Value) -> Option<&RbHash> {
        self.resolve(self.unwrap(value))?.as_hash()
    }

    /// Object or struct at a position, looking through wrappers.
    pub fn object(&self, value: &Value) -> Option<&RbObject> {
        self.resolve(self.unwrap(value))?.as_object()
    }

    /// Class name of an object, struct, or user-typed node.
    pub fn class_name(&self, value: &Value) -> Option<Cow<'_, str>> {
        let class = match self.resolve(self.unwrap(value))? {
            Node::Object(o) | Node::Struct(o) => o.class,
            Node::UserDefined(u) => u.class,
            Node::UserMarshal(u) => u.class,
            Node::Data(d) => d.class,
            Node::Class(name) | Node::Module(name) => return Some(Cow::Borrowed(name.as_str())),
            _ => return None,
        };
        Some(self.symbol_name(class))
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decode context: the per-session tables and the reference resolver.
//!
//! A context owns the symbol table, the node arena and the object reference
//! table for exactly one decode session. Nothing is global, so concurrent
//! sessions cannot share state.
//!
//! Composite values are built in two phases: [`DecodeContext::reserve`]
//! claims an arena slot (and, when registering, the next object-table
//! index) before any nested field is read, and [`DecodeContext::finalize`]
//! fills the slot once the fields are done. A link read in between resolves
//! to the reserved handle, which is how self-reference works.

use std::fmt;

use super::config::DecoderConfig;
use crate::core::{
    MarshalError, MarshalGraph, Node, NodeId, RbSymbol, ReferenceTable, Result as CoreResult,
    SymbolId, Value,
};

/// One step of the nesting path reported with decode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Array element
    Index(usize),
    /// Key of the n-th hash entry or field
    Key(usize),
    /// Value of a named field (ivar or struct member)
    Field(String),
    /// Value of a hash entry, by rendered key
    Entry(String),
    /// Wrapped value of `I`, `e` or `C`
    Base,
    /// Default of a `}` hash
    Default,
    /// Class or module name position
    Class,
    /// Payload of `U` or `d`
    Payload,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(i) => write!(f, "{{key {i}}}"),
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Entry(key) => write!(f, "[{key}]"),
            PathSegment::Base => f.write_str("<base>"),
            PathSegment::Default => f.write_str("<default>"),
            PathSegment::Class => f.write_str("<class>"),
            PathSegment::Payload => f.write_str("<payload>"),
        }
    }
}

/// Mutable state of one decode session.
#[derive(Debug)]
pub struct DecodeContext {
    symbols: Vec<RbSymbol>,
    nodes: Vec<Node>,
    objects: Vec<NodeId>,
    path: Vec<PathSegment>,
    depth: usize,
    max_depth: usize,
}

impl DecodeContext {
    /// Create an empty context.
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            symbols: Vec::new(),
            nodes: Vec::new(),
            objects: Vec::new(),
            path: Vec::new(),
            depth: 0,
            max_depth: config.max_depth,
        }
    }

    /// Number of symbol-table entries.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Number of object-table entries.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of arena nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no session has added anything to this context yet.
    pub fn is_fresh(&self) -> bool {
        self.symbols.is_empty() && self.nodes.is_empty()
    }

    /// Append a symbol to the symbol table.
    pub fn intern_symbol(&mut self, symbol: RbSymbol) -> SymbolId {
        self.symbols.push(symbol);
        SymbolId(self.symbols.len() - 1)
    }

    /// Get a symbol by handle.
    pub fn symbol(&self, id: SymbolId) -> &RbSymbol {
        &self.symbols[id.0]
    }

    /// Get a node by handle. Reserved slots read as [`Node::Pending`].
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Claim an arena slot; when `register` is set, also claim the next
    /// object-table index.
    pub fn reserve(&mut self, register: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Pending);
        if register {
            self.objects.push(id);
        }
        id
    }

    /// Fill a reserved slot.
    pub fn finalize(&mut self, id: NodeId, node: Node) {
        self.nodes[id.0] = node;
    }

    /// Resolve a symbol link index.
    pub fn resolve_symbol(&self, index: i64, offset: usize) -> CoreResult<SymbolId> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.symbols.len())
            .map(SymbolId)
            .ok_or_else(|| {
                MarshalError::invalid_reference(
                    ReferenceTable::Symbol,
                    index,
                    self.symbols.len(),
                    offset,
                )
            })
    }

    /// Resolve an object link index to the shared node handle.
    pub fn resolve_object(&self, index: i64, offset: usize) -> CoreResult<NodeId> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i).copied())
            .ok_or_else(|| {
                MarshalError::invalid_reference(
                    ReferenceTable::Object,
                    index,
                    self.objects.len(),
                    offset,
                )
            })
    }

    /// Descend one nesting level.
    pub fn enter(&mut self, offset: usize) -> CoreResult<()> {
        if self.depth >= self.max_depth {
            return Err(MarshalError::depth_limit(self.max_depth, offset));
        }
        self.depth += 1;
        Ok(())
    }

    /// Ascend one nesting level.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Push a path segment before decoding a nested value.
    pub fn push_path(&mut self, segment: PathSegment) {
        self.path.push(segment);
    }

    /// Pop the segment pushed for a value that decoded successfully.
    ///
    /// Failed values leave their segments in place, so the path at the time
    /// an error reaches the top is the path to the failure.
    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    /// Current path rendered from the root, e.g. `$[2].@name`.
    pub fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            out.push_str(&segment.to_string());
        }
        out
    }

    /// Consume the context into the decoded graph.
    pub fn into_graph(self, root: Value) -> MarshalGraph {
        MarshalGraph {
            symbols: self.symbols,
            nodes: self.nodes,
            objects: self.objects,
            root,
        }
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! JSON projection of a decoded graph.
//!
//! The projection is lossy: symbols and strings both become JSON strings,
//! and shared nodes are expanded at every position that reaches them
//! unless [`SharedPolicy::Reference`] is set. A node reached again while it
//! is still being projected is a cycle; [`CyclePolicy`] decides whether that
//! fails or emits a `{"$ref": n}` marker naming the node's object-table
//! index. Every node expansion counts against
//! [`ProjectionConfig::max_nodes`], so a small stream that shares nodes
//! heavily cannot blow up into an unbounded output.
//!
//! Keys that render to the same text (`"a"` and `:a`, `1` and `"1"`) keep
//! the first entry; later ones are dropped. The `"class"` and `"base"`
//! entries added by the projection come before any field, while
//! `"default"` comes after the hash entries.
//!
//! ## Example
//!
//! ```rust
//! use rbmarshal::json::JsonProjector;
//! use rbmarshal::marshal::MarshalDecoder;
//!
//! // {:hp => 10}
//! let bytes = [0x04, 0x08, b'{', 0x06, b':', 0x07, b'h', b'p', b'i', 0x0F];
//! let graph = MarshalDecoder::new().decode(&bytes).unwrap();
//! let json = JsonProjector::new(&graph).project_root().unwrap();
//! assert_eq!(json, serde_json::json!({"hp": 10}));
//! ```

use std::collections::HashSet;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::warn;

use crate::core::{
    MarshalError, MarshalGraph, Node, NodeId, RbFields, Result as CoreResult, SymbolId, Value,
};

/// Largest integer magnitude a JSON number carries without precision loss.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Default projection nesting bound.
pub const DEFAULT_PROJECTION_DEPTH: usize = 128;

/// Default budget of node expansions per projection.
pub const DEFAULT_MAX_NODES: usize = 1_000_000;

/// What to emit when projection reaches a node already on its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Fail with `CycleDetected`
    #[default]
    Error,
    /// Emit `{"$ref": <object-table index>}`
    Reference,
}

/// What to emit when projection reaches a node it has already expanded
/// elsewhere (a shared, acyclic node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedPolicy {
    /// Expand the node again at every position
    #[default]
    Expand,
    /// Emit `{"$ref": <object-table index>}` after the first expansion
    Reference,
}

/// Rendering of opaque `_dump` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BytesEncoding {
    /// Array of byte numbers
    #[default]
    Array,
    /// Lowercase hex string
    Hex,
}

/// Projection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub cycle_policy: CyclePolicy,
    pub max_depth: usize,
    pub bytes: BytesEncoding,
    /// Project an ivar wrapper carrying only encoding markers as its base
    pub collapse_encoding: bool,
    pub shared_policy: SharedPolicy,
    /// Node expansions allowed before failing with `NodeLimitExceeded`
    pub max_nodes: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::default(),
            max_depth: DEFAULT_PROJECTION_DEPTH,
            bytes: BytesEncoding::default(),
            collapse_encoding: false,
            shared_policy: SharedPolicy::default(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl ProjectionConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle policy.
    pub fn cycle_policy(mut self, cycle_policy: CyclePolicy) -> Self {
        self.cycle_policy = cycle_policy;
        self
    }

    /// Set the nesting bound.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the payload rendering.
    pub fn bytes(mut self, bytes: BytesEncoding) -> Self {
        self.bytes = bytes;
        self
    }

    /// Enable or disable encoding-wrapper collapsing.
    pub fn collapse_encoding(mut self, collapse: bool) -> Self {
        self.collapse_encoding = collapse;
        self
    }

    /// Set the policy for shared, acyclic nodes.
    pub fn shared_policy(mut self, shared_policy: SharedPolicy) -> Self {
        self.shared_policy = shared_policy;
        self
    }

    /// Set the node expansion budget.
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}

/// Projects graph positions into `serde_json` values.
pub struct JsonProjector<'g> {
    graph: &'g MarshalGraph,
    config: ProjectionConfig,
}

impl<'g> JsonProjector<'g> {
    /// Create a projector with the default configuration.
    pub fn new(graph: &'g MarshalGraph) -> Self {
        Self::with_config(graph, ProjectionConfig::default())
    }

    /// Create a projector with the given configuration.
    pub fn with_config(graph: &'g MarshalGraph, config: ProjectionConfig) -> Self {
        Self { graph, config }
    }

    /// Project the graph's root.
    pub fn project_root(&self) -> CoreResult<JsonValue> {
        self.project(self.graph.root())
    }

    /// Project any position of the graph.
    pub fn project(&self, value: &Value) -> CoreResult<JsonValue> {
        self.project_value(value, &mut Walk::default(), 0)
    }

    fn project_value(
        &self,
        value: &Value,
        walk: &mut Walk,
        depth: usize,
    ) -> CoreResult<JsonValue> {
        if depth >= self.config.max_depth {
            return Err(MarshalError::depth_limit(self.config.max_depth, 0));
        }

        match value {
            Value::Nil => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Fixnum(v) => Ok(project_i64(*v)),
            Value::Symbol(id) | Value::SymbolLink(id) => {
                Ok(JsonValue::String(self.graph.symbol_name(*id).into_owned()))
            }
            Value::Node(id) | Value::ObjectLink(id) => self.project_shared(*id, walk, depth),
        }
    }

    fn project_shared(&self, id: NodeId, walk: &mut Walk, depth: usize) -> CoreResult<JsonValue> {
        if walk.active.contains(&id) {
            let index = self.graph.object_index(id);
            return match self.config.cycle_policy {
                CyclePolicy::Error => Err(MarshalError::CycleDetected { index }),
                CyclePolicy::Reference => {
                    warn!(index = ?index, "cycle in projection, emitting reference");
                    Ok(reference(index))
                }
            };
        }
        if self.config.shared_policy == SharedPolicy::Reference && walk.expanded.contains(&id) {
            // Only nodes with a table index can be reached twice.
            if let Some(index) = self.graph.object_index(id) {
                return Ok(reference(Some(index)));
            }
        }

        walk.count += 1;
        if walk.count > self.config.max_nodes {
            return Err(MarshalError::NodeLimitExceeded {
                limit: self.config.max_nodes,
            });
        }
        walk.active.insert(id);
        walk.expanded.insert(id);
        let result = self.project_node(self.graph.node(id), walk, depth);
        walk.active.remove(&id);
        result
    }

    fn project_node(
        &self,
        node: &Node,
        walk: &mut Walk,
        depth: usize,
    ) -> CoreResult<JsonValue> {
        let depth = depth + 1;
        let json = match node {
            Node::Pending => JsonValue::Null,
            Node::Float(f) => Number::from_f64(f.value)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.text.clone())),
            Node::Bignum(i) => project_bigint(i.as_bigint()),
            Node::String(s) => JsonValue::String(s.to_string_lossy().into_owned()),
            Node::Regexp(r) => {
                let mut obj = Map::new();
                obj.insert(
                    "source".to_string(),
                    JsonValue::String(r.source.to_string_lossy().into_owned()),
                );
                obj.insert("flags".to_string(), JsonValue::String(r.flags.to_string()));
                JsonValue::Object(obj)
            }
            Node::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.project_value(item, walk, depth)?);
                }
                JsonValue::Array(values)
            }
            Node::Hash(hash) => {
                let mut obj = Map::new();
                for (key, value) in hash.iter() {
                    let projected = self.project_value(value, walk, depth)?;
                    obj.entry(key.content().to_text().into_owned())
                        .or_insert(projected);
                }
                if let Some(default) = &hash.default {
                    if !obj.contains_key("default") {
                        let projected = self.project_value(default, walk, depth)?;
                        obj.insert("default".to_string(), projected);
                    }
                }
                JsonValue::Object(obj)
            }
            Node::Object(o) | Node::Struct(o) => {
                let mut obj = Map::new();
                obj.insert("class".to_string(), self.class_json(o.class));
                self.insert_fields(&mut obj, &o.fields, walk, depth)?;
                JsonValue::Object(obj)
            }
            Node::Instance(inst) => {
                if self.config.collapse_encoding && inst.has_only_encoding() {
                    return self.project_value(&inst.base, walk, depth);
                }
                let mut obj = Map::new();
                obj.insert("base".to_string(), self.project_value(&inst.base, walk, depth)?);
                self.insert_fields(&mut obj, &inst.fields, walk, depth)?;
                JsonValue::Object(obj)
            }
            Node::Class(name) | Node::Module(name) => JsonValue::String(name.clone()),
            Node::UserClass(uc) => {
                let mut obj = Map::new();
                obj.insert("class".to_string(), self.class_json(uc.class));
                obj.insert("base".to_string(), self.project_value(&uc.base, walk, depth)?);
                JsonValue::Object(obj)
            }
            Node::UserDefined(ud) => {
                let mut obj = Map::new();
                obj.insert("class".to_string(), self.class_json(ud.class));
                obj.insert("data".to_string(), self.bytes_json(&ud.data));
                JsonValue::Object(obj)
            }
            Node::UserMarshal(um) => {
                let mut obj = Map::new();
                obj.insert("class".to_string(), self.class_json(um.class));
                obj.insert("data".to_string(), self.project_value(&um.value, walk, depth)?);
                JsonValue::Object(obj)
            }
            Node::Data(d) => {
                let mut obj = Map::new();
                obj.insert("class".to_string(), self.class_json(d.class));
                obj.insert("data".to_string(), self.project_value(&d.value, walk, depth)?);
                JsonValue::Object(obj)
            }
            Node::Extended(ext) => {
                let mut obj = Map::new();
                obj.insert("extended".to_string(), self.class_json(ext.module));
                obj.insert("base".to_string(), self.project_value(&ext.base, walk, depth)?);
                JsonValue::Object(obj)
            }
        };
        Ok(json)
    }

    /// Append named fields; the first entry for a key text wins.
    fn insert_fields(
        &self,
        obj: &mut Map<String, JsonValue>,
        fields: &RbFields,
        walk: &mut Walk,
        depth: usize,
    ) -> CoreResult<()> {
        for (key, value) in fields {
            let projected = self.project_value(value, walk, depth)?;
            obj.entry(key.content().to_text().into_owned())
                .or_insert(projected);
        }
        Ok(())
    }

    fn class_json(&self, class: SymbolId) -> JsonValue {
        JsonValue::String(self.graph.symbol_name(class).into_owned())
    }

    fn bytes_json(&self, data: &[u8]) -> JsonValue {
        match self.config.bytes {
            BytesEncoding::Array => {
                JsonValue::Array(data.iter().map(|&b| JsonValue::from(b)).collect())
            }
            BytesEncoding::Hex => JsonValue::String(hex::encode(data)),
        }
    }
}

/// Traversal state of one projection.
#[derive(Default)]
struct Walk {
    /// Nodes on the current path
    active: HashSet<NodeId>,
    /// Nodes expanded so far
    expanded: HashSet<NodeId>,
    /// Expansion count checked against the budget
    count: usize,
}

fn reference(index: Option<usize>) -> JsonValue {
    let mut marker = Map::new();
    marker.insert(
        "$ref".to_string(),
        index.map_or(JsonValue::Null, JsonValue::from),
    );
    JsonValue::Object(marker)
}

fn project_i64(value: i64) -> JsonValue {
    if value.unsigned_abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(value)
    } else {
        JsonValue::String(value.to_string())
    }
}

fn project_bigint(value: &BigInt) -> JsonValue {
    match value.to_i64() {
        Some(v) => project_i64(v),
        None => JsonValue::String(value.to_string()),
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! JSON projection integration tests.

mod common;

use common::Stream;
use rbmarshal::json::{
    BytesEncoding, CyclePolicy, JsonProjector, ProjectionConfig, SharedPolicy, DEFAULT_MAX_NODES,
};
use rbmarshal::marshal::config::DEFAULT_MAX_DEPTH;
use rbmarshal::{MarshalError, MarshalGraph, MarshalDecoder, Node, Value};
use serde_json::json;

fn graph(bytes: &[u8]) -> MarshalGraph {
    MarshalDecoder::new().decode(bytes).unwrap()
}

fn project(bytes: &[u8], config: ProjectionConfig) -> rbmarshal::Result<serde_json::Value> {
    let graph = graph(bytes);
    JsonProjector::with_config(&graph, config).project_root()
}

#[test]
fn test_basic_values() {
    let cases = [
        (Stream::new().nil().build(), json!(null)),
        (Stream::new().bool(true).build(), json!(true)),
        (Stream::new().bool(false).build(), json!(false)),
        (Stream::new().array(0).build(), json!([])),
        (Stream::new().hash(0).build(), json!({})),
        (Stream::new().fixnum(-123).build(), json!(-123)),
        (Stream::new().symbol("sym").build(), json!("sym")),
        (Stream::new().string("text").build(), json!("text")),
        (Stream::new().class("Foo").build(), json!("Foo")),
    ];
    for (bytes, expected) in cases {
        assert_eq!(rbmarshal::to_json(&bytes).unwrap(), expected);
    }
}

#[test]
fn test_actor_projection() {
    let bytes = Stream::new()
        .array(2)
        .nil()
        .object("RPG::Actor", 2)
        .symbol("@id")
        .fixnum(1)
        .symbol("@name")
        .utf8_string("Eric")
        .build();

    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(
        json,
        json!([null, {"class": "RPG::Actor", "@id": 1, "@name": {"base": "Eric", "E": true}}])
    );

    let json = project(&bytes, ProjectionConfig::new().collapse_encoding(true)).unwrap();
    assert_eq!(
        json,
        json!([null, {"class": "RPG::Actor", "@id": 1, "@name": "Eric"}])
    );
}

#[test]
fn test_object_keys_keep_stream_order() {
    let bytes = Stream::new()
        .hash(3)
        .symbol("z")
        .fixnum(1)
        .symbol("a")
        .fixnum(2)
        .symbol("m")
        .fixnum(3)
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[test]
fn test_default_hash() {
    let bytes = Stream::new()
        .hash_with_default(1)
        .string("a")
        .fixnum(1)
        .string("fallback")
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!({"a": 1, "default": "fallback"}));
}

#[test]
fn test_default_entry_does_not_replace_real_key() {
    let bytes = Stream::new()
        .hash_with_default(1)
        .string("default")
        .fixnum(1)
        .fixnum(2)
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!({"default": 1}));
}

#[test]
fn test_cycle_error_and_reference() {
    let bytes = Stream::new().hash(1).symbol("self").link(0).build();

    let err = project(&bytes, ProjectionConfig::default()).unwrap_err();
    assert!(matches!(err, MarshalError::CycleDetected { index: Some(0) }));

    let config = ProjectionConfig::new().cycle_policy(CyclePolicy::Reference);
    let json = project(&bytes, config).unwrap();
    assert_eq!(json, json!({"self": {"$ref": 0}}));
}

#[test]
fn test_indirect_cycle_reference() {
    // a = []; b = [a]; a << b; a
    let bytes = Stream::new().array(1).array(1).link(0).build();
    let config = ProjectionConfig::new().cycle_policy(CyclePolicy::Reference);
    assert_eq!(project(&bytes, config).unwrap(), json!([[{"$ref": 0}]]));
}

#[test]
fn test_shared_subgraph_is_not_a_cycle() {
    let bytes = Stream::new()
        .array(3)
        .array(1)
        .fixnum(1)
        .link(1)
        .link(1)
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!([[1], [1], [1]]));
}

#[test]
fn test_mutation_shows_in_projection() {
    let bytes = Stream::new().array(2).array(0).link(1).build();
    let mut graph = graph(&bytes);
    let inner = graph.array(graph.root()).unwrap()[0].node_id().unwrap();
    if let Node::Array(items) = graph.node_mut(inner) {
        items.push(Value::Bool(true));
    }
    let json = JsonProjector::new(&graph).project_root().unwrap();
    assert_eq!(json, json!([[true], [true]]));
}

#[test]
fn test_integers_beyond_safe_range() {
    // 2**53 - 1 stays a number, 2**53 becomes a string
    let max_safe = Stream::new()
        .bignum(false, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x1F])
        .build();
    assert_eq!(
        project(&max_safe, ProjectionConfig::default()).unwrap(),
        json!(9_007_199_254_740_991u64)
    );
    let beyond = Stream::new()
        .bignum(true, &[0, 0, 0, 0, 0, 0, 0x20])
        .build();
    assert_eq!(
        project(&beyond, ProjectionConfig::default()).unwrap(),
        json!("-9007199254740992")
    );
}

#[test]
fn test_non_finite_floats_as_text() {
    let bytes = Stream::new()
        .array(3)
        .float("inf")
        .float("-inf")
        .float("nan")
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!(["inf", "-inf", "nan"]));
}

#[test]
fn test_user_types() {
    let bytes = Stream::new()
        .array(5)
        .user_defined("Color", &[0, 128, 255])
        .user_marshal("Set")
        .array(1)
        .fixnum(1)
        .user_class("Name")
        .string("n")
        .extended("Mod")
        .hash(0)
        .data("Digest")
        .string("abc")
        .build();

    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(
        json,
        json!([
            {"class": "Color", "data": [0, 128, 255]},
            {"class": "Set", "data": [1]},
            {"class": "Name", "base": "n"},
            {"extended": "Mod", "base": {}},
            {"class": "Digest", "data": "abc"},
        ])
    );

    let json = project(&bytes, ProjectionConfig::new().bytes(BytesEncoding::Hex)).unwrap();
    assert_eq!(json[0], json!({"class": "Color", "data": "0080ff"}));
}

#[test]
fn test_regexp_flags() {
    let bytes = Stream::new().regexp("^a b$", 0x07).build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!({"source": "^a b$", "flags": "mix"}));
}

#[test]
fn test_projection_depth_bound() {
    let bytes = Stream::new().array(1).array(1).array(1).nil().build();
    assert!(project(&bytes, ProjectionConfig::new().max_depth(4)).is_ok());
    assert!(matches!(
        project(&bytes, ProjectionConfig::new().max_depth(3)),
        Err(MarshalError::DepthLimitExceeded { limit: 3, .. })
    ));
}

#[test]
fn test_project_sub_position() {
    let bytes = Stream::new().array(2).fixnum(1).string("two").build();
    let graph = graph(&bytes);
    let items = graph.array(graph.root()).unwrap();
    let projector = JsonProjector::new(&graph);
    assert_eq!(projector.project(&items[1]).unwrap(), json!("two"));
}

/// `levels` arrays where each holds its child twice: `[child, @child]`.
fn doubling_dag(levels: i64) -> Vec<u8> {
    let mut stream = Stream::new();
    for _ in 0..levels {
        stream = stream.array(2);
    }
    stream = stream.string("x");
    for index in (1..=levels).rev() {
        stream = stream.link(index);
    }
    stream.build()
}

#[test]
fn test_doubling_dag_hits_node_budget() {
    let bytes = doubling_dag(24);

    let err = project(&bytes, ProjectionConfig::new().max_nodes(1000)).unwrap_err();
    assert!(matches!(err, MarshalError::NodeLimitExceeded { limit: 1000 }));

    let err = project(&bytes, ProjectionConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        MarshalError::NodeLimitExceeded { limit } if limit == DEFAULT_MAX_NODES
    ));
}

#[test]
fn test_doubling_dag_with_shared_references() {
    let config = ProjectionConfig::new()
        .shared_policy(SharedPolicy::Reference)
        .max_nodes(100);
    let json = project(&doubling_dag(24), config).unwrap();

    assert_eq!(json[1], json!({"$ref": 1}));
    let mut inner = &json;
    for level in 1..24 {
        inner = &inner[0];
        assert_eq!(inner[1], json!({"$ref": level + 1}));
    }
    assert_eq!(inner[0], json!("x"));
    assert!(serde_json::to_string(&json).unwrap().len() < 1024);
}

#[test]
fn test_small_dag_expands_by_default() {
    let bytes = doubling_dag(2);
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!([["x", "x"], ["x", "x"]]));
}

#[test]
fn test_string_and_symbol_key_collision_keeps_first() {
    let bytes = Stream::new()
        .hash(2)
        .string("a")
        .fixnum(1)
        .symbol("a")
        .fixnum(2)
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json, json!({"a": 1}));
}

#[test]
fn test_field_named_class_keeps_first() {
    // An ivar literally named `class` cannot displace the class name.
    let bytes = Stream::new()
        .object("Point", 1)
        .symbol("class")
        .fixnum(7)
        .build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert_eq!(json["class"], json!("Point"));
}

#[test]
fn test_default_depth_fits_test_thread() {
    let levels = DEFAULT_MAX_DEPTH - 1;
    let mut stream = Stream::new();
    for _ in 0..levels - 1 {
        stream = stream.array(1);
    }
    let bytes = stream.array(0).build();

    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    let mut inner = &json;
    for _ in 0..levels - 1 {
        inner = &inner[0];
    }
    assert_eq!(inner, &json!([]));
}

#[test]
fn test_default_depth_fits_test_thread_for_hashes() {
    let levels = DEFAULT_MAX_DEPTH - 1;
    let mut stream = Stream::new();
    for _ in 0..levels - 1 {
        stream = stream.hash(1).fixnum(1);
    }
    let bytes = stream.hash(0).build();
    let json = project(&bytes, ProjectionConfig::default()).unwrap();
    assert!(json.get("1").is_some());
}

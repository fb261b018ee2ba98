// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared declarations and values for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use cdrkey::schema::{DeclaredType, EnumShape, Member, Shape, UnionCase, UnionShape};
use cdrkey::{CodecConfig, CodecValue, TypeRegistry};

// ============================================================================
// Registries
// ============================================================================

/// Fresh registry with the default configuration.
pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new())
}

/// Fresh registry with a custom configuration.
pub fn registry_with(config: CodecConfig) -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::with_config(config))
}

// ============================================================================
// Flat types
// ============================================================================

/// `{ a: int32, b: string<5> }`
pub fn sample_type() -> DeclaredType {
    DeclaredType::structure(
        "test::Sample",
        vec![
            Member::new("a", Shape::int32()),
            Member::new("b", Shape::bounded_string(5)),
        ],
    )
}

pub fn sample_value(a: i32, b: &str) -> CodecValue {
    CodecValue::structure([("a", CodecValue::Int32(a)), ("b", CodecValue::from(b))])
}

/// Robot keyed on `id` only.
pub fn robot_type() -> DeclaredType {
    DeclaredType::structure(
        "fleet::Robot",
        vec![
            Member::new("id", Shape::int32()),
            Member::new("name", Shape::string()),
            Member::new("pose", Shape::float64()),
        ],
    )
    .with_keys(["id"])
}

pub fn robot_value(id: i32, name: &str, pose: f64) -> CodecValue {
    CodecValue::structure([
        ("id", CodecValue::Int32(id)),
        ("name", CodecValue::from(name)),
        ("pose", CodecValue::Float64(pose)),
    ])
}

/// Keyless telemetry record.
pub fn telemetry_type() -> DeclaredType {
    DeclaredType::structure(
        "fleet::Telemetry",
        vec![
            Member::new("battery", Shape::float32()),
            Member::new("ticks", Shape::uint32()),
        ],
    )
    .keyless()
}

pub fn telemetry_value(battery: f32, ticks: u32) -> CodecValue {
    CodecValue::structure([
        ("battery", CodecValue::Float32(battery)),
        ("ticks", CodecValue::UInt32(ticks)),
    ])
}

/// Two int64 key members: the key is exactly 16 bytes.
pub fn wide_type() -> DeclaredType {
    DeclaredType::structure(
        "test::Wide",
        vec![
            Member::new("hi", Shape::int64()),
            Member::new("lo", Shape::int64()),
        ],
    )
}

/// One byte more than [`wide_type`].
pub fn wider_type() -> DeclaredType {
    DeclaredType::structure(
        "test::Wider",
        vec![
            Member::new("hi", Shape::int64()),
            Member::new("lo", Shape::int64()),
            Member::new("tag", Shape::uint8()),
        ],
    )
}

/// Unbounded string key.
pub fn tag_type() -> DeclaredType {
    DeclaredType::structure(
        "fleet::Tag",
        vec![
            Member::new("serial", Shape::string()),
            Member::new("note", Shape::string()),
        ],
    )
    .with_keys(["serial"])
}

pub fn color_type() -> DeclaredType {
    DeclaredType::enumeration(
        "test::Color",
        EnumShape::new([("RED", 0), ("GREEN", 5), ("BLUE", 9)]),
    )
}

// ============================================================================
// Unions
// ============================================================================

/// int16 discriminator, case 1 bool, case 2 int32.
pub fn choice_type() -> DeclaredType {
    DeclaredType::union(
        "test::Choice",
        UnionShape::new(
            Shape::int16(),
            vec![
                UnionCase::single("flag", 1, Shape::bool()),
                UnionCase::single("count", 2, Shape::int32()),
            ],
        ),
    )
}

/// uint8 discriminator with a string default.
pub fn mode_type() -> DeclaredType {
    DeclaredType::union(
        "test::Mode",
        UnionShape::new(
            Shape::uint8(),
            vec![
                UnionCase::single("zero", 0, Shape::int32()),
                UnionCase::single("one", 1, Shape::int32()),
            ],
        )
        .with_default("other", Shape::string()),
    )
}

/// Union whose key is its discriminator only.
pub fn shape_union_type() -> DeclaredType {
    DeclaredType::union(
        "draw::Shape",
        UnionShape::new(
            Shape::int32(),
            vec![
                UnionCase::single("radius", 1, Shape::float64()),
                UnionCase::single("side", 2, Shape::float32()),
            ],
        )
        .with_key_discriminator(),
    )
}

pub fn drawing_type() -> DeclaredType {
    DeclaredType::structure(
        "draw::Drawing",
        vec![
            Member::new("shape", Shape::named("draw::Shape")),
            Member::new("title", Shape::string()),
        ],
    )
    .with_keys(["shape"])
}

// ============================================================================
// Recursive types
// ============================================================================

/// Self-recursive tree node.
pub fn node_type() -> DeclaredType {
    DeclaredType::structure(
        "tree::Node",
        vec![
            Member::new("value", Shape::int32()),
            Member::new("children", Shape::sequence(Shape::named("tree::Node"))),
        ],
    )
}

pub fn node_value(value: i32, children: Vec<CodecValue>) -> CodecValue {
    CodecValue::structure([
        ("value", CodecValue::Int32(value)),
        ("children", CodecValue::Array(children)),
    ])
}

/// `graph::A` and `graph::B` reference each other through optionals.
pub fn graph_a_type() -> DeclaredType {
    DeclaredType::structure(
        "graph::A",
        vec![
            Member::new("id", Shape::int32()),
            Member::new("b", Shape::optional(Shape::named("graph::B"))),
        ],
    )
}

pub fn graph_b_type() -> DeclaredType {
    DeclaredType::structure(
        "graph::B",
        vec![
            Member::new("name", Shape::bounded_string(8)),
            Member::new("a", Shape::optional(Shape::named("graph::A"))),
        ],
    )
}

/// `A{1, B{"mid", A{2, null}}}`
pub fn graph_value() -> CodecValue {
    let inner = CodecValue::structure([("id", CodecValue::Int32(2)), ("b", CodecValue::Null)]);
    let b = CodecValue::structure([("name", CodecValue::from("mid")), ("a", inner)]);
    CodecValue::structure([("id", CodecValue::Int32(1)), ("b", b)])
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Full-sample encoding tests.
//!
//! Byte layouts are checked against hand-computed CDR encodings; everything
//! else is checked by round trip through the registry.

mod common;

use cdrkey::core::DEFAULT_MAX_DEPTH;
use cdrkey::schema::{DeclaredType, Member, Shape, UnionCase, UnionShape};
use cdrkey::{CodecConfig, CodecError, CodecValue, Endianness, LengthPrefix};

use common::*;

// ============================================================================
// Exact Layouts
// ============================================================================

#[test]
fn test_sample_little_endian_layout() {
    let registry = registry();
    let support = registry
        .register_support(sample_type())
        .expect("register sample");

    let bytes = support
        .serialize(&sample_value(-1, "hi"))
        .expect("serialize");
    assert_eq!(
        bytes,
        vec![
            0x00, 0x01, 0x00, 0x00, // header, little endian
            0xFF, 0xFF, 0xFF, 0xFF, // a = -1
            0x03, 0x00, 0x00, 0x00, // strlen("hi") + 1
            0x68, 0x69, 0x00, // "hi\0"
            0x00, // pad
        ]
    );
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        sample_value(-1, "hi")
    );
}

#[test]
fn test_sample_big_endian_layout() {
    let registry = registry();
    let support = registry
        .register_support(sample_type())
        .expect("register sample");

    let bytes = support
        .serialize_with(&sample_value(-1, "hi"), Endianness::Big)
        .expect("serialize");
    assert_eq!(
        bytes,
        vec![
            0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x03, 0x68, 0x69,
            0x00, 0x00,
        ]
    );
    // the header decides the byte order, not the registry config
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        sample_value(-1, "hi")
    );
}

#[test]
fn test_union_case_layouts() {
    let registry = registry();
    let support = registry
        .register_support(choice_type())
        .expect("register choice");

    let flag = CodecValue::union_case(1, CodecValue::Bool(true));
    let bytes = support.serialize(&flag).expect("serialize flag");
    assert_eq!(bytes, vec![0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00]);
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), flag);

    let count = CodecValue::union_case(2, CodecValue::Int32(7));
    let bytes = support.serialize(&count).expect("serialize count");
    assert_eq!(
        bytes,
        vec![0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00]
    );
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), count);
}

#[test]
fn test_sequence_prefix_width_follows_config() {
    let blob = || {
        DeclaredType::structure(
            "test::Blob",
            vec![Member::new("data", Shape::sequence(Shape::uint8()))],
        )
    };
    let value = CodecValue::structure([(
        "data",
        CodecValue::Array(vec![CodecValue::UInt8(1), CodecValue::UInt8(2)]),
    )]);

    let narrow = registry().register_support(blob()).expect("register");
    assert_eq!(
        narrow.serialize(&value).expect("serialize"),
        vec![0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x01, 0x02]
    );

    let config = CodecConfig::default().with_length_prefix(LengthPrefix::U32);
    let wide = registry_with(config)
        .register_support(blob())
        .expect("register");
    let bytes = wide.serialize(&value).expect("serialize");
    assert_eq!(
        bytes,
        vec![0x00, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00]
    );
    assert_eq!(wide.deserialize(&bytes).expect("deserialize"), value);
}

#[test]
fn test_union_aligns_to_wide_count_prefix() {
    let config = CodecConfig::default().with_length_prefix(LengthPrefix::U32);
    let registry = registry_with(config);
    registry
        .register(DeclaredType::union(
            "test::Payload",
            UnionShape::new(
                Shape::int8(),
                vec![UnionCase::single("items", 1, Shape::sequence(Shape::uint8()))],
            ),
        ))
        .expect("register payload");
    let support = registry
        .register_support(DeclaredType::structure(
            "test::Packet",
            vec![
                Member::new("tag", Shape::uint8()),
                Member::new("body", Shape::named("test::Payload")),
            ],
        ))
        .expect("register packet");

    let value = CodecValue::structure([
        ("tag", CodecValue::UInt8(0xAA)),
        (
            "body",
            CodecValue::union_case(1, CodecValue::Array(vec![CodecValue::UInt8(7)])),
        ),
    ]);
    let bytes = support.serialize(&value).expect("serialize");
    assert_eq!(
        bytes,
        vec![
            0x00, 0x01, 0x00, 0x00, // header
            0xAA, 0x00, 0x00, 0x00, // tag, pad to the union's 4-byte alignment
            0x01, 0x00, 0x00, 0x00, // discriminator, pad
            0x01, 0x00, 0x00, 0x00, // count
            0x07, 0x00, 0x00, 0x00, // item, trailing pad
        ]
    );
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), value);
}

#[test]
fn test_config_from_toml() {
    let config = CodecConfig::from_toml_str(
        r#"
        endianness = "big"
        length_prefix = "u32"
        "#,
    )
    .expect("parse config");
    assert_eq!(config.endianness, Endianness::Big);
    assert_eq!(config.length_prefix, LengthPrefix::U32);

    let support = registry_with(config)
        .register_support(sample_type())
        .expect("register");
    let bytes = support.serialize(&sample_value(1, "")).expect("serialize");
    assert_eq!(&bytes[..8], &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_string_bound_enforced() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");

    let at_bound = sample_value(0, "hello");
    let bytes = support.serialize(&at_bound).expect("bound is inclusive");
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), at_bound);

    let err = support
        .serialize(&sample_value(0, "hello!"))
        .expect_err("over bound");
    assert!(matches!(
        err.root_cause(),
        CodecError::BoundsViolation {
            length: 6,
            bound: 5,
            ..
        }
    ));
}

#[test]
fn test_sequence_bound_enforced() {
    let support = registry()
        .register_support(DeclaredType::structure(
            "test::Triple",
            vec![Member::new(
                "items",
                Shape::bounded_sequence(Shape::int32(), 3),
            )],
        ))
        .expect("register");
    let items = |n: i32| {
        CodecValue::structure([(
            "items",
            CodecValue::Array((0..n).map(CodecValue::Int32).collect()),
        )])
    };

    let bytes = support.serialize(&items(3)).expect("three items fit");
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), items(3));
    assert!(matches!(
        support.serialize(&items(4)).expect_err("four items").root_cause(),
        CodecError::BoundsViolation { bound: 3, .. }
    ));
}

// ============================================================================
// Unions
// ============================================================================

#[test]
fn test_union_label_outside_cases_rejected() {
    let support = registry()
        .register_support(choice_type())
        .expect("register");
    let err = support
        .serialize(&CodecValue::union_case(3, CodecValue::Int32(1)))
        .expect_err("label 3 is not a case");
    assert!(matches!(
        err.root_cause(),
        CodecError::InvalidDiscriminator { label: 3, .. }
    ));
}

#[test]
fn test_union_label_outside_discriminator_domain_is_unencodable() {
    let registry = registry();
    let err = registry
        .register(DeclaredType::union(
            "test::TooWide",
            UnionShape::new(
                Shape::int16(),
                vec![UnionCase::single("big", 40_000, Shape::bool())],
            ),
        ))
        .expect_err("40000 does not fit int16");
    assert!(matches!(err, CodecError::UnencodableShape { .. }));
    assert!(!registry.contains("test::TooWide").expect("contains"));
}

#[test]
fn test_default_case_uses_sentinel() {
    let support = registry().register_support(mode_type()).expect("register");

    let other = CodecValue::union_default(CodecValue::from("x"));
    let bytes = support.serialize(&other).expect("serialize");
    assert_eq!(
        bytes,
        vec![
            0x00, 0x01, 0x00, 0x00, // header
            0x02, 0x00, 0x00, 0x00, // sentinel 2, pad
            0x02, 0x00, 0x00, 0x00, // strlen("x") + 1
            0x78, 0x00, 0x00, 0x00, // "x\0", pad
        ]
    );
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), other);

    let one = CodecValue::union_case(1, CodecValue::Int32(-4));
    let bytes = support.serialize(&one).expect("serialize");
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), one);
}

#[test]
fn test_undeclared_label_decodes_as_default() {
    let support = registry().register_support(mode_type()).expect("register");
    let bytes = [
        0x00, 0x01, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x79, 0x00, 0x00,
        0x00,
    ];
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        CodecValue::union_default(CodecValue::from("y"))
    );
}

#[test]
fn test_bool_union_with_default_exhausts_domain() {
    let err = registry()
        .register(DeclaredType::union(
            "test::Switch",
            UnionShape::new(
                Shape::bool(),
                vec![
                    UnionCase::single("off", 0, Shape::int8()),
                    UnionCase::single("on", 1, Shape::int8()),
                ],
            )
            .with_default("never", Shape::int8()),
        ))
        .expect_err("no sentinel left");
    assert!(matches!(err, CodecError::UnionDomainExhausted { .. }));
}

// ============================================================================
// Value Coercion and Shape Mismatch
// ============================================================================

#[test]
fn test_wider_integer_value_is_narrowed_when_it_fits() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");
    let value = CodecValue::structure([("a", CodecValue::Int64(5)), ("b", CodecValue::from("z"))]);
    let bytes = support.serialize(&value).expect("5 fits int32");
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        sample_value(5, "z")
    );

    let overflow =
        CodecValue::structure([("a", CodecValue::Int64(1 << 40)), ("b", CodecValue::from("z"))]);
    assert!(matches!(
        support.serialize(&overflow).expect_err("overflow").root_cause(),
        CodecError::TypeMismatch { .. }
    ));
}

#[test]
fn test_missing_member_reported() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");
    let err = support
        .serialize(&CodecValue::structure([("a", CodecValue::Int32(1))]))
        .expect_err("b is missing");
    match err.root_cause() {
        CodecError::MissingMember { type_name, member } => {
            assert_eq!(type_name, "test::Sample");
            assert_eq!(member, "b");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Decode Failures
// ============================================================================

#[test]
fn test_truncated_sample_fails() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");
    let bytes = support
        .serialize(&sample_value(-1, "hi"))
        .expect("serialize");

    for cut in [0, 3, 6, 10, 14] {
        let err = support
            .deserialize(&bytes[..cut])
            .expect_err("truncated input");
        assert!(err.is_decode_failure(), "cut at {cut}: {err}");
    }
}

fn chain_type() -> DeclaredType {
    DeclaredType::structure(
        "test::Chain",
        vec![Member::new(
            "next",
            Shape::optional(Shape::named("test::Chain")),
        )],
    )
}

fn chain_value(depth: usize) -> CodecValue {
    (0..depth).fold(
        CodecValue::structure([("next", CodecValue::Null)]),
        |inner, _| CodecValue::structure([("next", inner)]),
    )
}

#[test]
fn test_deeply_nested_input_fails_to_decode() {
    let support = registry()
        .register_support(chain_type())
        .expect("register chain");

    let mut bytes = vec![0x00, 0x01, 0x00, 0x00];
    bytes.resize(4 + 2_000_000, 0x01);
    let err = support.deserialize(&bytes).expect_err("nesting limit");
    assert!(err.is_decode_failure(), "{err}");
}

#[test]
fn test_nesting_limit_on_encode() {
    let support = registry()
        .register_support(chain_type())
        .expect("register chain");

    let within = chain_value(100);
    let bytes = support.serialize(&within).expect("100 levels fit");
    assert_eq!(support.deserialize(&bytes).expect("deserialize"), within);

    let err = support
        .serialize(&chain_value(DEFAULT_MAX_DEPTH + 1))
        .expect_err("too deep");
    assert!(matches!(
        err.root_cause(),
        CodecError::InvalidData { context, .. } if context == "nesting"
    ));

    let strict = CodecConfig {
        max_depth: 2,
        ..CodecConfig::default()
    };
    let shallow = registry_with(strict)
        .register_support(chain_type())
        .expect("register chain");
    shallow.serialize(&chain_value(2)).expect("two levels fit");
    assert!(shallow.serialize(&chain_value(3)).is_err());
}

#[test]
fn test_bad_header_fails() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");
    let mut bytes = support
        .serialize(&sample_value(-1, "hi"))
        .expect("serialize");
    bytes[1] = 0x07;
    assert!(matches!(
        support.deserialize(&bytes),
        Err(CodecError::InvalidData { .. })
    ));
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let support = registry()
        .register_support(sample_type())
        .expect("register");
    let mut bytes = support
        .serialize(&sample_value(42, "tail"))
        .expect("serialize");
    bytes.extend_from_slice(&[0xAA; 8]);
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        sample_value(42, "tail")
    );
}

// ============================================================================
// Every Shape
// ============================================================================

#[test]
fn test_every_shape_round_trip() {
    let registry = registry();
    // referenced types registered afterwards
    let everything = registry
        .register_support(DeclaredType::structure(
            "test::Everything",
            vec![
                Member::new("flag", Shape::bool()),
                Member::new("letter", Shape::char()),
                Member::new("small", Shape::int8()),
                Member::new("big", Shape::uint64()),
                Member::new("ratio", Shape::float32()),
                Member::new("blob", Shape::bounded_bytes(4)),
                Member::new("triple", Shape::array(Shape::int16(), 3)),
                Member::new("lookup", Shape::map(Shape::string(), Shape::int32())),
                Member::new("color", Shape::named("test::Color")),
                Member::new("maybe", Shape::optional(Shape::int8())),
                Member::new("none", Shape::optional(Shape::float64())),
                Member::new("choice", Shape::named("test::Choice")),
            ],
        ))
        .expect("register everything");
    registry.register(color_type()).expect("register color");
    registry.register(choice_type()).expect("register choice");

    let value = CodecValue::structure([
        ("flag", CodecValue::Bool(true)),
        ("letter", CodecValue::Char('z')),
        ("small", CodecValue::Int8(-3)),
        ("big", CodecValue::UInt64(u64::MAX)),
        ("ratio", CodecValue::Float32(0.25)),
        ("blob", CodecValue::Bytes(vec![1, 2, 3])),
        (
            "triple",
            CodecValue::Array(vec![
                CodecValue::Int16(1),
                CodecValue::Int16(-2),
                CodecValue::Int16(3),
            ]),
        ),
        (
            "lookup",
            CodecValue::Map(vec![
                (CodecValue::from("a"), CodecValue::Int32(1)),
                (CodecValue::from("b"), CodecValue::Int32(2)),
            ]),
        ),
        ("color", CodecValue::enumerator("GREEN")),
        ("maybe", CodecValue::Int8(5)),
        ("none", CodecValue::Null),
        ("choice", CodecValue::union_case(2, CodecValue::Int32(9))),
    ]);

    for endianness in [Endianness::Little, Endianness::Big] {
        let bytes = everything
            .serialize_with(&value, endianness)
            .expect("serialize");
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(everything.deserialize(&bytes).expect("deserialize"), value);
    }
}

#[test]
fn test_enum_accepts_declared_ordinal() {
    let registry = registry();
    let support = registry
        .register_support(DeclaredType::structure(
            "test::Paint",
            vec![Member::new("color", Shape::named("test::Color"))],
        ))
        .expect("register paint");
    registry.register(color_type()).expect("register color");

    let by_ordinal = CodecValue::structure([("color", CodecValue::UInt32(9))]);
    let bytes = support.serialize(&by_ordinal).expect("serialize");
    assert_eq!(&bytes[4..8], &[0x09, 0x00, 0x00, 0x00]);
    assert_eq!(
        support.deserialize(&bytes).expect("deserialize"),
        CodecValue::structure([("color", CodecValue::enumerator("BLUE"))])
    );

    let undeclared = CodecValue::structure([("color", CodecValue::enumerator("PURPLE"))]);
    assert!(support.serialize(&undeclared).is_err());
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Declared type descriptions.
//!
//! A [`DeclaredType`] is what an IDL generator hands to the codec: a named
//! struct, union or enum built from [`Shape`]s. Declarations are plain data
//! and round-trip through serde, so generator output can be loaded from
//! JSON with [`DeclaredType::from_json`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{CodecError, Result};

/// Primitive wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// Boolean, one byte
    Bool,
    /// Single byte character
    Char,
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl PrimitiveType {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveType::Bool
            | PrimitiveType::Char
            | PrimitiveType::Int8
            | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Natural alignment, equal to the size.
    pub const fn alignment(self) -> usize {
        self.size()
    }

    /// Inclusive value range for integer types.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            PrimitiveType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            PrimitiveType::UInt8 => Some((0, u8::MAX as i128)),
            PrimitiveType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            PrimitiveType::UInt16 => Some((0, u16::MAX as i128)),
            PrimitiveType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            PrimitiveType::UInt32 => Some((0, u32::MAX as i128)),
            PrimitiveType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            PrimitiveType::UInt64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    /// Whether the type can act as a union discriminator.
    pub const fn is_discriminator(self) -> bool {
        !matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }

    /// IDL-style name.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
        }
    }
}

/// Shape of a member, case or collection element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Fixed-width primitive
    Primitive { primitive: PrimitiveType },
    /// UTF-8 string, optionally bounded in bytes
    String {
        #[serde(default)]
        bound: Option<usize>,
    },
    /// Opaque bytes, optionally bounded
    Bytes {
        #[serde(default)]
        bound: Option<usize>,
    },
    /// Fixed-length array
    Array { element: Box<Shape>, length: usize },
    /// Variable-length sequence, optionally bounded
    Sequence {
        element: Box<Shape>,
        #[serde(default)]
        bound: Option<usize>,
    },
    /// Key/value mapping written in insertion order
    Map {
        key: Box<Shape>,
        value: Box<Shape>,
        #[serde(default)]
        bound: Option<usize>,
    },
    /// Inline enumeration
    Enum(EnumShape),
    /// Inline discriminated union
    Union(UnionShape),
    /// Presence flag followed by the value
    Optional { inner: Box<Shape> },
    /// Reference to another declared type by fully-qualified name
    Named { name: String },
}

impl Shape {
    /// Primitive shape.
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Shape::Primitive { primitive }
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveType::Bool)
    }

    pub fn char() -> Self {
        Self::primitive(PrimitiveType::Char)
    }

    pub fn int8() -> Self {
        Self::primitive(PrimitiveType::Int8)
    }

    pub fn uint8() -> Self {
        Self::primitive(PrimitiveType::UInt8)
    }

    pub fn int16() -> Self {
        Self::primitive(PrimitiveType::Int16)
    }

    pub fn uint16() -> Self {
        Self::primitive(PrimitiveType::UInt16)
    }

    pub fn int32() -> Self {
        Self::primitive(PrimitiveType::Int32)
    }

    pub fn uint32() -> Self {
        Self::primitive(PrimitiveType::UInt32)
    }

    pub fn int64() -> Self {
        Self::primitive(PrimitiveType::Int64)
    }

    pub fn uint64() -> Self {
        Self::primitive(PrimitiveType::UInt64)
    }

    pub fn float32() -> Self {
        Self::primitive(PrimitiveType::Float32)
    }

    pub fn float64() -> Self {
        Self::primitive(PrimitiveType::Float64)
    }

    /// Unbounded string.
    pub fn string() -> Self {
        Shape::String { bound: None }
    }

    /// String bounded to `bound` UTF-8 bytes.
    pub fn bounded_string(bound: usize) -> Self {
        Shape::String { bound: Some(bound) }
    }

    /// Unbounded opaque bytes.
    pub fn bytes() -> Self {
        Shape::Bytes { bound: None }
    }

    /// Opaque bytes bounded to `bound`.
    pub fn bounded_bytes(bound: usize) -> Self {
        Shape::Bytes { bound: Some(bound) }
    }

    /// Fixed array of `length` elements.
    pub fn array(element: Shape, length: usize) -> Self {
        Shape::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Unbounded sequence.
    pub fn sequence(element: Shape) -> Self {
        Shape::Sequence {
            element: Box::new(element),
            bound: None,
        }
    }

    /// Sequence bounded to `bound` elements.
    pub fn bounded_sequence(element: Shape, bound: usize) -> Self {
        Shape::Sequence {
            element: Box::new(element),
            bound: Some(bound),
        }
    }

    /// Unbounded mapping.
    pub fn map(key: Shape, value: Shape) -> Self {
        Shape::Map {
            key: Box::new(key),
            value: Box::new(value),
            bound: None,
        }
    }

    /// Optional value.
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional {
            inner: Box::new(inner),
        }
    }

    /// Reference to a declared type.
    pub fn named(name: impl Into<String>) -> Self {
        Shape::Named { name: name.into() }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Shape::Primitive { primitive } => primitive.name().to_string(),
            Shape::String { bound: Some(n) } => format!("string<{n}>"),
            Shape::String { bound: None } => "string".to_string(),
            Shape::Bytes { bound: Some(n) } => format!("bytes<{n}>"),
            Shape::Bytes { bound: None } => "bytes".to_string(),
            Shape::Array { element, length } => format!("{}[{length}]", element.describe()),
            Shape::Sequence {
                element,
                bound: Some(n),
            } => format!("sequence<{}, {n}>", element.describe()),
            Shape::Sequence { element, .. } => format!("sequence<{}>", element.describe()),
            Shape::Map { key, value, .. } => {
                format!("map<{}, {}>", key.describe(), value.describe())
            }
            Shape::Enum(_) => "enum".to_string(),
            Shape::Union(_) => "union".to_string(),
            Shape::Optional { inner } => format!("optional<{}>", inner.describe()),
            Shape::Named { name } => name.clone(),
        }
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Shape::Named { name } => out.push(name),
            Shape::Array { element, .. } | Shape::Sequence { element, .. } => {
                element.collect_names(out)
            }
            Shape::Map { key, value, .. } => {
                key.collect_names(out);
                value.collect_names(out);
            }
            Shape::Optional { inner } => inner.collect_names(out),
            Shape::Union(union) => union.collect_names(out),
            Shape::Primitive { .. } | Shape::String { .. } | Shape::Bytes { .. } | Shape::Enum(_) => {}
        }
    }
}

/// One enumerator with its declared ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub ordinal: u32,
}

/// Enumeration with an explicit name -> ordinal mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumShape {
    pub enumerators: Vec<Enumerator>,
}

impl EnumShape {
    /// Explicit `(name, ordinal)` pairs.
    pub fn new<I, S>(enumerators: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            enumerators: enumerators
                .into_iter()
                .map(|(name, ordinal)| Enumerator {
                    name: name.into(),
                    ordinal,
                })
                .collect(),
        }
    }

    /// Ordinals assigned 0, 1, 2... in declaration order.
    pub fn sequential<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().zip(0u32..))
    }
}

/// A labelled union case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionCase {
    pub name: String,
    pub labels: Vec<i64>,
    pub shape: Shape,
}

impl UnionCase {
    pub fn new(name: impl Into<String>, labels: Vec<i64>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            labels,
            shape,
        }
    }

    /// Case with a single label.
    pub fn single(name: impl Into<String>, label: i64, shape: Shape) -> Self {
        Self::new(name, vec![label], shape)
    }
}

/// The default arm of a union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultCase {
    pub name: String,
    pub shape: Shape,
}

/// Discriminated union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionShape {
    pub discriminator: Box<Shape>,
    pub cases: Vec<UnionCase>,
    /// Boxed because a default arm may itself hold a union shape.
    #[serde(default)]
    pub default: Option<Box<DefaultCase>>,
    /// Only the discriminator contributes to the key.
    #[serde(default)]
    pub key_discriminator: bool,
}

impl UnionShape {
    pub fn new(discriminator: Shape, cases: Vec<UnionCase>) -> Self {
        Self {
            discriminator: Box::new(discriminator),
            cases,
            default: None,
            key_discriminator: false,
        }
    }

    /// Set the default case.
    pub fn with_default(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.default = Some(Box::new(DefaultCase {
            name: name.into(),
            shape,
        }));
        self
    }

    /// Restrict the key to the discriminator.
    pub fn with_key_discriminator(mut self) -> Self {
        self.key_discriminator = true;
        self
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.discriminator.collect_names(out);
        for case in &self.cases {
            case.shape.collect_names(out);
        }
        if let Some(default) = &self.default {
            default.shape.collect_names(out);
        }
    }
}

/// A named struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub shape: Shape,
}

impl Member {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Extensibility kind. Recorded but not modeled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extensibility {
    #[default]
    Final,
    Appendable,
    Mutable,
}

/// Body of a declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeBody {
    /// Ordered members
    Struct { members: Vec<Member> },
    Union(UnionShape),
    Enum(EnumShape),
}

/// A user type as described by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredType {
    /// Fully-qualified name, e.g. `pkg::Point`
    pub name: String,
    #[serde(default)]
    pub extensibility: Extensibility,
    /// Members that form the instance key. `None` means every member,
    /// an empty list means the type is keyless.
    #[serde(default)]
    pub key_members: Option<Vec<String>>,
    pub body: TypeBody,
}

impl DeclaredType {
    /// Struct declaration.
    pub fn structure(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            extensibility: Extensibility::default(),
            key_members: None,
            body: TypeBody::Struct { members },
        }
    }

    /// Union declaration.
    pub fn union(name: impl Into<String>, union: UnionShape) -> Self {
        Self {
            name: name.into(),
            extensibility: Extensibility::default(),
            key_members: None,
            body: TypeBody::Union(union),
        }
    }

    /// Enum declaration.
    pub fn enumeration(name: impl Into<String>, shape: EnumShape) -> Self {
        Self {
            name: name.into(),
            extensibility: Extensibility::default(),
            key_members: None,
            body: TypeBody::Enum(shape),
        }
    }

    /// Set the key member list.
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_members = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Declare the type keyless.
    pub fn keyless(mut self) -> Self {
        self.key_members = Some(Vec::new());
        self
    }

    pub fn with_extensibility(mut self, extensibility: Extensibility) -> Self {
        self.extensibility = extensibility;
        self
    }

    /// Load a declaration from generator JSON.
    ///
    /// An unknown shape tag is reported as [`CodecError::UnencodableShape`].
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(json_error)
    }

    /// Load a declaration from an already parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(json_error)
    }

    /// Struct members, if this is a struct.
    pub fn members(&self) -> Option<&[Member]> {
        match &self.body {
            TypeBody::Struct { members } => Some(members),
            _ => None,
        }
    }

    /// Whether `member` takes part in the instance key.
    pub fn is_key_member(&self, member: &str) -> bool {
        match &self.key_members {
            None => true,
            Some(keys) => keys.iter().any(|k| k == member),
        }
    }

    /// Whether the key list is explicitly non-empty.
    pub fn has_explicit_keys(&self) -> bool {
        matches!(&self.key_members, Some(keys) if !keys.is_empty())
    }

    /// Every type name referenced anywhere in the body, without duplicates.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        match &self.body {
            TypeBody::Struct { members } => {
                for member in members {
                    member.shape.collect_names(&mut names);
                }
            }
            TypeBody::Union(union) => union.collect_names(&mut names),
            TypeBody::Enum(_) => {}
        }
        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(*name));
        names
    }

    /// Check naming rules that do not need other types.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CodecError::invalid_schema("<unnamed>", "type name is empty"));
        }
        match &self.body {
            TypeBody::Struct { members } => {
                let mut seen = HashSet::new();
                for member in members {
                    if !seen.insert(member.name.as_str()) {
                        return Err(CodecError::invalid_schema(
                            &self.name,
                            format!("duplicate member '{}'", member.name),
                        ));
                    }
                }
                if let Some(keys) = &self.key_members {
                    for key in keys {
                        if !seen.contains(key.as_str()) {
                            return Err(CodecError::invalid_schema(
                                &self.name,
                                format!("key member '{key}' is not a member"),
                            ));
                        }
                    }
                }
            }
            TypeBody::Union(_) | TypeBody::Enum(_) => {
                if self.has_explicit_keys() {
                    return Err(CodecError::invalid_schema(
                        &self.name,
                        "key members are only valid on structs",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn json_error(err: serde_json::Error) -> CodecError {
    let message = err.to_string();
    if message.contains("unknown variant") {
        CodecError::unencodable("<json>", message)
    } else {
        CodecError::invalid_schema("<json>", message)
    }
}

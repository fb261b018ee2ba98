// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dynamic values written from and read into by the codec machines.
//!
//! All variants are serde-serializable, so values can be dumped as JSON
//! for inspection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Struct value as member name -> value mapping.
pub type DecodedMessage = HashMap<String, CodecValue>;

/// Dynamic value for any declared type.
///
/// Struct members are looked up by name, so the map order is irrelevant;
/// the declared member order decides the wire layout. Maps keep their
/// entries in insertion order because that order is written to the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CodecValue {
    Bool(bool),

    /// Single byte character (Latin-1 range).
    Char(char),

    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float32(f32),
    Float64(f64),

    // String (UTF-8)
    String(String),

    // Opaque bytes
    Bytes(Vec<u8>),

    /// Enumerator name; the declared ordinal goes on the wire.
    Enum(String),

    // Fixed arrays and sequences
    Array(Vec<CodecValue>),

    /// Key/value pairs in insertion order.
    Map(Vec<(CodecValue, CodecValue)>),

    // Nested struct
    Struct(DecodedMessage),

    /// Union value. `label` is `None` when the default case is active.
    Union {
        label: Option<i64>,
        value: Box<CodecValue>,
    },

    // Absent optional member
    Null,
}

impl CodecValue {
    /// Absent optional member.
    pub fn is_null(&self) -> bool {
        matches!(self, CodecValue::Null)
    }

    /// Numeric value widened to f64. Integers above 2^53 lose precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CodecValue::Float32(v) => Some(f64::from(*v)),
            CodecValue::Float64(v) => Some(*v),
            // every integer kind fits i128
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Any integer widened to i128, so range checks never overflow.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            CodecValue::Int8(v) => v.into(),
            CodecValue::Int16(v) => v.into(),
            CodecValue::Int32(v) => v.into(),
            CodecValue::Int64(v) => v.into(),
            CodecValue::UInt8(v) => v.into(),
            CodecValue::UInt16(v) => v.into(),
            CodecValue::UInt32(v) => v.into(),
            CodecValue::UInt64(v) => v.into(),
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CodecValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&DecodedMessage> {
        match self {
            CodecValue::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Elements of an array or sequence value.
    pub fn as_array(&self) -> Option<&[CodecValue]> {
        match self {
            CodecValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Struct member by name.
    pub fn field(&self, name: &str) -> Option<&CodecValue> {
        self.as_struct()?.get(name)
    }

    /// Short name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecValue::Bool(_) => "bool",
            CodecValue::Char(_) => "char",
            CodecValue::Int8(_) => "int8",
            CodecValue::Int16(_) => "int16",
            CodecValue::Int32(_) => "int32",
            CodecValue::Int64(_) => "int64",
            CodecValue::UInt8(_) => "uint8",
            CodecValue::UInt16(_) => "uint16",
            CodecValue::UInt32(_) => "uint32",
            CodecValue::UInt64(_) => "uint64",
            CodecValue::Float32(_) => "float32",
            CodecValue::Float64(_) => "float64",
            CodecValue::String(_) => "string",
            CodecValue::Bytes(_) => "bytes",
            CodecValue::Enum(_) => "enum",
            CodecValue::Array(_) => "array",
            CodecValue::Map(_) => "map",
            CodecValue::Struct(_) => "struct",
            CodecValue::Union { .. } => "union",
            CodecValue::Null => "null",
        }
    }

    /// Build a struct value from `(name, value)` pairs.
    pub fn structure<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, CodecValue)>,
        K: Into<String>,
    {
        CodecValue::Struct(
            members
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Union value with an explicit case label.
    pub fn union_case(label: i64, value: CodecValue) -> Self {
        CodecValue::Union {
            label: Some(label),
            value: Box::new(value),
        }
    }

    /// Union value with the default case active.
    pub fn union_default(value: CodecValue) -> Self {
        CodecValue::Union {
            label: None,
            value: Box::new(value),
        }
    }

    pub fn enumerator(name: impl Into<String>) -> Self {
        CodecValue::Enum(name.into())
    }
}

impl From<bool> for CodecValue {
    fn from(v: bool) -> Self {
        CodecValue::Bool(v)
    }
}

impl From<i32> for CodecValue {
    fn from(v: i32) -> Self {
        CodecValue::Int32(v)
    }
}

impl From<i64> for CodecValue {
    fn from(v: i64) -> Self {
        CodecValue::Int64(v)
    }
}

impl From<f64> for CodecValue {
    fn from(v: f64) -> Self {
        CodecValue::Float64(v)
    }
}

impl From<&str> for CodecValue {
    fn from(v: &str) -> Self {
        CodecValue::String(v.to_string())
    }
}

impl From<String> for CodecValue {
    fn from(v: String) -> Self {
        CodecValue::String(v)
    }
}

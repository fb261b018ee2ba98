// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Declared type descriptions.
//!
//! Declarations come from an external IDL generator, either built in code
//! with the constructors in [`ast`] or loaded from the generator's JSON.

pub mod ast;

pub use ast::{
    DeclaredType, DefaultCase, EnumShape, Enumerator, Extensibility, Member, PrimitiveType, Shape,
    TypeBody, UnionCase, UnionShape,
};

use crate::core::Result;

/// Parse generator JSON holding one declaration or an array of them.
pub fn parse_declarations(text: &str) -> Result<Vec<DeclaredType>> {
    match serde_json::from_str::<serde_json::Value>(text)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(DeclaredType::from_json_value)
            .collect(),
        single => Ok(vec![DeclaredType::from_json_value(single)?]),
    }
}

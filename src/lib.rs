// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # cdrkey
//!
//! CDR serialization and instance-key derivation for declared types.
//!
//! A [`TypeRegistry`] turns declared types (structs, unions and enums, as
//! emitted by an IDL generator) into codec machines. Types may reference
//! each other in any order, including recursively; a type becomes usable
//! once every name it reaches is registered.
//!
//! For each registered type the library provides:
//! - `serialize` / `deserialize` of full samples with the 4-byte CDR
//!   encapsulation header
//! - `key`: the big-endian key-member encoding, padded to at least 16 bytes
//! - `keyhash`: the padded key when the key can never exceed 16 bytes,
//!   otherwise its MD5 digest
//!
//! ## Architecture
//!
//! - `core/` - errors, values, configuration and the type registry
//! - `schema/` - declared type descriptions
//! - `encoding/cdr/` - buffer, machines, builder, key sizing and keyhash
//!
//! ## Example
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use cdrkey::schema::{DeclaredType, Member, Shape};
//! use cdrkey::{CodecValue, TypeRegistry};
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let sensor = registry.register_support(
//!     DeclaredType::structure(
//!         "robot::Sensor",
//!         vec![
//!             Member::new("id", Shape::int32()),
//!             Member::new("label", Shape::bounded_string(5)),
//!         ],
//!     )
//!     .with_keys(["id"]),
//! )?;
//!
//! let value = CodecValue::structure([
//!     ("id", CodecValue::Int32(-1)),
//!     ("label", CodecValue::from("hi")),
//! ]);
//! let bytes = sensor.serialize(&value)?;
//! assert_eq!(sensor.deserialize(&bytes)?, value);
//! assert_eq!(sensor.key(&value)?.len(), 16);
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    CodecConfig, CodecError, CodecValue, DecodedMessage, Endianness, LengthPrefix, PendingType,
    Result, TypeHandle, TypeRegistry,
};

// Encoding/decoding
pub mod encoding;

pub use encoding::cdr::{KeyHash, KeyHashMode, TypeSupport};

// Declared types
pub mod schema;

pub use schema::{parse_declarations, DeclaredType, PrimitiveType, Shape};

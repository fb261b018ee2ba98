// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout cdrkey.
//!
//! This module provides the foundational types for the library:
//! - [`CodecError`] - Error handling
//! - [`CodecValue`] - Dynamic value representation
//! - [`CodecConfig`] - Wire choices shared by a registry
//! - [`TypeRegistry`] - Declared types and their machines

pub mod config;
pub mod error;
pub mod registry;
pub mod value;

pub use config::{
    CodecConfig, Endianness, LengthPrefix, DEFAULT_MAX_DEPTH, DEFAULT_MAX_UNBOUNDED_LENGTH,
};
pub use error::{CodecError, Result};
pub use registry::{PendingType, TypeHandle, TypeRegistry};
pub use value::{CodecValue, DecodedMessage};

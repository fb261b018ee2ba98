// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CDR (Common Data Representation) module.
//!
//! Provides the byte buffer, the machine tree that encodes and decodes
//! values, machine construction from declared types, worst-case key sizing
//! and keyhash derivation.

pub mod buffer;
pub mod builder;
pub mod calculator;
pub mod codec;
pub mod keyhash;
pub mod machine;

pub use buffer::{CdrBuffer, CDR_HEADER_SIZE};
pub use builder::{build_type, BuildError, BuiltType, TypeResolver};
pub use calculator::MaxSizeFinder;
pub use codec::TypeSupport;
pub use keyhash::{KeyHash, KeyHashMode, KEY_HASH_SIZE};
pub use machine::{Machine, MachineLookup, MachineRole, TypeId, WalkContext};

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Wire encodings.
//!
//! - [`cdr`] - CDR samples and instance keys

pub mod cdr;

pub use cdr::{CdrBuffer, KeyHash, KeyHashMode, TypeSupport};

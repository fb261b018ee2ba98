// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec configuration.
//!
//! A registry is created with one [`CodecConfig`]; every type registered
//! in it shares the same wire choices.
//!
//! ```toml
//! endianness = "big"
//! length_prefix = "u32"
//! initial_capacity = 256
//! ```

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Default protocol maximum for unbounded collections.
pub const DEFAULT_MAX_UNBOUNDED_LENGTH: usize = 65_535;

/// Default limit on nested type references within one value.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Byte order of primitive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    #[default]
    Little,
}

impl Endianness {
    /// Representation identifier stored in byte 1 of the encapsulation header.
    pub const fn header_flag(self) -> u8 {
        match self {
            Endianness::Big => 0x00,
            Endianness::Little => 0x01,
        }
    }

    /// Decode the header flag. Anything but 0 or 1 is rejected.
    pub const fn from_header_flag(flag: u8) -> Option<Self> {
        match flag {
            0x00 => Some(Endianness::Big),
            0x01 => Some(Endianness::Little),
            _ => None,
        }
    }
}

/// Width of the count prefix written before sequences, bytes and maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPrefix {
    /// 2-byte count, limits collections to 65535 elements
    #[default]
    U16,
    /// 4-byte count, as in standard CDR sequence headers
    U32,
}

impl LengthPrefix {
    /// Size (and alignment) of the prefix in bytes.
    pub const fn width(self) -> usize {
        match self {
            LengthPrefix::U16 => 2,
            LengthPrefix::U32 => 4,
        }
    }

    /// Largest count the prefix can carry.
    pub const fn max_count(self) -> usize {
        match self {
            LengthPrefix::U16 => u16::MAX as usize,
            LengthPrefix::U32 => u32::MAX as usize,
        }
    }
}

/// Configuration shared by every type of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Byte order used by `serialize` when none is given.
    pub endianness: Endianness,
    /// Count prefix width for sequences, bytes and maps.
    pub length_prefix: LengthPrefix,
    /// Initial capacity of freshly created buffers.
    pub initial_capacity: usize,
    /// Element count assumed for unbounded collections when sizing keys.
    pub max_unbounded_length: usize,
    /// Deepest chain of type references a value may nest through.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            endianness: Endianness::default(),
            length_prefix: LengthPrefix::default(),
            initial_capacity: 64,
            max_unbounded_length: DEFAULT_MAX_UNBOUNDED_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builder-style endianness override.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Builder-style length prefix override.
    pub fn with_length_prefix(mut self, length_prefix: LengthPrefix) -> Self {
        self.length_prefix = length_prefix;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.endianness, Endianness::Little);
        assert_eq!(config.length_prefix, LengthPrefix::U16);
        assert_eq!(config.max_unbounded_length, 65_535);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = CodecConfig::from_toml_str("endianness = \"big\"\nlength_prefix = \"u32\"\n")
            .expect("parse config");
        assert_eq!(config.endianness, Endianness::Big);
        assert_eq!(config.length_prefix, LengthPrefix::U32);
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.max_depth, 128);
    }

    #[test]
    fn test_from_toml_rejects_unknown_endianness() {
        assert!(CodecConfig::from_toml_str("endianness = \"middle\"").is_err());
    }

    #[test]
    fn test_header_flag() {
        assert_eq!(Endianness::Big.header_flag(), 0);
        assert_eq!(Endianness::Little.header_flag(), 1);
        assert_eq!(Endianness::from_header_flag(1), Some(Endianness::Little));
        assert_eq!(Endianness::from_header_flag(7), None);
    }

    #[test]
    fn test_length_prefix_width() {
        assert_eq!(LengthPrefix::U16.width(), 2);
        assert_eq!(LengthPrefix::U32.width(), 4);
        assert_eq!(LengthPrefix::U16.max_count(), 65_535);
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Instance key padding and keyhash derivation.

use std::fmt;

use md5::{Digest, Md5};

/// Size of a keyhash and minimum size of a key.
pub const KEY_HASH_SIZE: usize = 16;

/// How a type's keyhash is derived from its key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyHashMode {
    /// The zero-padded key itself (max key size fits in 16 bytes)
    Raw,
    /// MD5 of the unpadded key
    Md5,
}

impl KeyHashMode {
    /// Pick the mode for a statically computed maximum key size.
    pub const fn for_max_key_size(max_key_size: usize) -> Self {
        if max_key_size <= KEY_HASH_SIZE {
            KeyHashMode::Raw
        } else {
            KeyHashMode::Md5
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyHashMode::Raw => "raw",
            KeyHashMode::Md5 => "md5",
        }
    }
}

impl fmt::Display for KeyHashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 16-byte instance identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyHash([u8; KEY_HASH_SIZE]);

impl KeyHash {
    /// Derive the keyhash from the natural (unpadded) key encoding.
    pub fn from_key(key: &[u8], mode: KeyHashMode) -> Self {
        let mut out = [0u8; KEY_HASH_SIZE];
        match mode {
            KeyHashMode::Raw => {
                let len = key.len().min(KEY_HASH_SIZE);
                out[..len].copy_from_slice(&key[..len]);
            }
            KeyHashMode::Md5 => out.copy_from_slice(&Md5::digest(key)),
        }
        KeyHash(out)
    }

    pub const fn from_bytes(bytes: [u8; KEY_HASH_SIZE]) -> Self {
        KeyHash(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; KEY_HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for KeyHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Right-pad a key with zero bytes to at least [`KEY_HASH_SIZE`].
pub fn pad_key(mut key: Vec<u8>) -> Vec<u8> {
    if key.len() < KEY_HASH_SIZE {
        key.resize(KEY_HASH_SIZE, 0);
    }
    key
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Sample and key encoding entry points, and the per-type façade.
//!
//! Full samples start with the 4-byte encapsulation header and align from
//! offset 4. Keys carry no header, are always big-endian and align from
//! offset 0.

use std::sync::{Arc, Mutex};

use crate::core::{CodecError, CodecValue, Endianness, Result, TypeHandle, TypeRegistry};

use super::buffer::{CdrBuffer, CDR_HEADER_SIZE};
use super::keyhash::{pad_key, KeyHash, KeyHashMode};
use super::machine::{Machine, WalkContext};

/// Encode a full sample: header, value, then zero padding to a 4-byte
/// boundary.
pub fn encode_sample(
    machine: &Machine,
    value: &CodecValue,
    cx: &WalkContext<'_>,
    endianness: Endianness,
    capacity: usize,
) -> Result<Vec<u8>> {
    let mut buf = CdrBuffer::with_capacity(capacity);
    buf.write_bytes(&[0x00, endianness.header_flag(), 0x00, 0x00]);
    buf.set_origin(CDR_HEADER_SIZE);
    buf.set_endianness(endianness);
    machine.write(&mut buf, value, cx)?;
    buf.align(4);
    Ok(buf.into_bytes())
}

/// Decode a full sample. Trailing bytes after the value are ignored.
pub fn decode_sample(machine: &Machine, bytes: &[u8], cx: &WalkContext<'_>) -> Result<CodecValue> {
    if bytes.len() < CDR_HEADER_SIZE {
        return Err(CodecError::buffer_too_short(CDR_HEADER_SIZE, bytes.len(), 0));
    }
    if bytes[0] != 0x00 {
        return Err(CodecError::invalid_data(
            "encapsulation header",
            format!("unsupported representation {:#04x}{:02x}", bytes[0], bytes[1]),
        ));
    }
    let endianness = Endianness::from_header_flag(bytes[1]).ok_or_else(|| {
        CodecError::invalid_data(
            "encapsulation header",
            format!("unsupported representation flag {:#04x}", bytes[1]),
        )
    })?;

    let mut buf = CdrBuffer::from_bytes(bytes);
    buf.seek(CDR_HEADER_SIZE);
    buf.set_origin(CDR_HEADER_SIZE);
    buf.set_endianness(endianness);
    machine.read(&mut buf, cx)
}

/// Encode the natural (unpadded) key of `value` through `buf`.
///
/// The buffer is zeroed and rewound first, so reusing one buffer across
/// calls yields the same bytes as a fresh one.
pub fn encode_key(
    machine: &Machine,
    value: &CodecValue,
    cx: &WalkContext<'_>,
    buf: &mut CdrBuffer,
) -> Result<Vec<u8>> {
    buf.zero_out();
    buf.seek(0);
    buf.set_origin(0);
    buf.set_endianness(Endianness::Big);
    machine.write(buf, value, cx)?;
    Ok(buf.as_bytes().to_vec())
}

/// Decode key bytes. Zero padding after the key is ignored.
pub fn decode_key(machine: &Machine, bytes: &[u8], cx: &WalkContext<'_>) -> Result<CodecValue> {
    let mut buf = CdrBuffer::from_bytes(bytes);
    buf.set_endianness(Endianness::Big);
    machine.read(&mut buf, cx)
}

/// One registered type bound to its registry.
///
/// Keeps a reusable key buffer behind a mutex, so concurrent `key` calls on
/// one façade are serialized while samples use a fresh buffer per call.
pub struct TypeSupport {
    registry: Arc<TypeRegistry>,
    handle: TypeHandle,
    key_buffer: Mutex<CdrBuffer>,
}

impl TypeSupport {
    pub(crate) fn new(registry: Arc<TypeRegistry>, handle: TypeHandle, capacity: usize) -> Self {
        Self {
            registry,
            handle,
            key_buffer: Mutex::new(CdrBuffer::with_capacity(capacity)),
        }
    }

    /// Fully-qualified type name.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Serialize in the registry's configured byte order.
    pub fn serialize(&self, value: &CodecValue) -> Result<Vec<u8>> {
        self.registry.serialize(&self.handle, value)
    }

    /// Serialize in the given byte order.
    pub fn serialize_with(&self, value: &CodecValue, endianness: Endianness) -> Result<Vec<u8>> {
        self.registry.serialize_with(&self.handle, value, endianness)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<CodecValue> {
        self.registry.deserialize(&self.handle, bytes)
    }

    /// Instance key, at least 16 bytes.
    pub fn key(&self, value: &CodecValue) -> Result<Vec<u8>> {
        let mut buf = self.lock_key_buffer()?;
        Ok(pad_key(self.registry.key_into(&self.handle, value, &mut buf)?))
    }

    /// 16-byte keyhash.
    pub fn keyhash(&self, value: &CodecValue) -> Result<KeyHash> {
        let mut buf = self.lock_key_buffer()?;
        self.registry.keyhash_into(&self.handle, value, &mut buf)
    }

    pub fn deserialize_key(&self, bytes: &[u8]) -> Result<CodecValue> {
        self.registry.deserialize_key(&self.handle, bytes)
    }

    /// Worst-case unpadded key size.
    pub fn max_key_size(&self) -> Result<usize> {
        self.registry.max_key_size(&self.handle)
    }

    pub fn keyhash_mode(&self) -> Result<KeyHashMode> {
        self.registry.keyhash_mode(&self.handle)
    }

    fn lock_key_buffer(&self) -> Result<std::sync::MutexGuard<'_, CdrBuffer>> {
        self.key_buffer
            .lock()
            .map_err(|e| CodecError::Other(format!("Key buffer lock poisoned: {e}")))
    }
}

impl std::fmt::Debug for TypeSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSupport")
            .field("type", &self.handle.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::cdr::machine::NoTypes;
    use crate::schema::PrimitiveType;

    fn int32() -> Machine {
        Machine::Primitive(PrimitiveType::Int32)
    }

    #[test]
    fn test_sample_header_and_padding() {
        let cx = WalkContext::standalone(&NoTypes);
        let bytes = encode_sample(
            &Machine::Primitive(PrimitiveType::UInt8),
            &CodecValue::UInt8(9),
            &cx,
            Endianness::Little,
            8,
        )
        .unwrap();
        assert_eq!(bytes, vec![0x00, 0x01, 0x00, 0x00, 9, 0, 0, 0]);
    }

    #[test]
    fn test_sample_round_trip_both_orders() {
        let cx = WalkContext::standalone(&NoTypes);
        for endianness in [Endianness::Big, Endianness::Little] {
            let bytes = encode_sample(&int32(), &CodecValue::Int32(-7), &cx, endianness, 4).unwrap();
            assert_eq!(bytes[1], endianness.header_flag());
            assert_eq!(
                decode_sample(&int32(), &bytes, &cx).unwrap(),
                CodecValue::Int32(-7)
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let cx = WalkContext::standalone(&NoTypes);
        assert!(matches!(
            decode_sample(&int32(), &[0, 1], &cx),
            Err(CodecError::BufferTooShort { .. })
        ));
        assert!(decode_sample(&int32(), &[0, 7, 0, 0, 1, 0, 0, 0], &cx)
            .unwrap_err()
            .is_decode_failure());
    }

    #[test]
    fn test_decode_truncated_body() {
        let cx = WalkContext::standalone(&NoTypes);
        assert!(decode_sample(&int32(), &[0, 1, 0, 0, 1, 0], &cx)
            .unwrap_err()
            .is_decode_failure());
    }

    #[test]
    fn test_key_is_big_endian_and_reuses_buffer() {
        let cx = WalkContext::standalone(&NoTypes);
        let mut buf = CdrBuffer::new();
        let long = Machine::String { bound: None };
        encode_key(&long, &"a long string value".into(), &cx, &mut buf).unwrap();
        let key = encode_key(&int32(), &CodecValue::Int32(1), &cx, &mut buf).unwrap();
        assert_eq!(key, vec![0, 0, 0, 1]);
        assert_eq!(
            decode_key(&int32(), &pad_key(key), &cx).unwrap(),
            CodecValue::Int32(1)
        );
    }
}

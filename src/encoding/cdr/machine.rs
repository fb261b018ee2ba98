// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec machines.
//!
//! A [`Machine`] is an immutable tree that knows how to write a
//! [`CodecValue`] into a [`CdrBuffer`], read it back, and walk a
//! [`MaxSizeFinder`] to bound the encoded size. The set of node kinds is
//! fixed by the wire format, so dispatch is a `match` over a closed enum.
//!
//! References to other declared types are [`Machine::TypeRef`] nodes that
//! hold an index into the registry's type table; the referenced tree is
//! looked up through [`MachineLookup`] on every walk. This lets a type
//! contain itself (through an optional or a sequence) without an
//! infinitely sized tree.

#[cfg(test)]
use std::collections::HashMap;

use crate::core::{CodecError, CodecValue, DecodedMessage, LengthPrefix, Result};
use crate::schema::{Enumerator, PrimitiveType};

use super::buffer::CdrBuffer;
use super::calculator::MaxSizeFinder;

/// Index of a registered type in the registry's type table.
pub type TypeId = usize;

/// Which tree of a registered type a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineRole {
    /// Every member, used for full samples
    Full,
    /// Key members only, used when the type sits on a key path
    Key,
}

/// Access to the machines of registered types.
pub trait MachineLookup {
    /// Machine of type `id` for the given role.
    ///
    /// Fails with [`CodecError::UnresolvedDependency`] while the type is
    /// still waiting on an unregistered name.
    fn machine(&self, id: TypeId, role: MachineRole) -> Result<&Machine>;
}

/// Everything a walk needs besides the buffer.
#[derive(Clone, Copy)]
pub struct WalkContext<'a> {
    /// Registered types, for following references
    pub types: &'a dyn MachineLookup,
    /// Count prefix width for sequences, bytes and maps
    pub length_prefix: LengthPrefix,
    /// Element count assumed for unbounded collections when sizing
    pub max_unbounded_length: usize,
    /// Type references that may still be followed below this point
    pub depth_budget: usize,
}

impl<'a> WalkContext<'a> {
    /// Context for the tree behind a reference, one level deeper. Fails
    /// once the budget is spent.
    fn descend(&self, name: &str) -> Result<WalkContext<'a>> {
        let depth_budget = self.depth_budget.checked_sub(1).ok_or_else(|| {
            CodecError::invalid_data(
                "nesting",
                format!("reference to '{name}' exceeds the nesting limit"),
            )
        })?;
        Ok(WalkContext {
            depth_budget,
            ..*self
        })
    }
}

/// Reference to another registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Fully-qualified name, for diagnostics
    pub name: String,
    pub id: TypeId,
    pub role: MachineRole,
}

/// One struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberMachine {
    pub name: String,
    pub machine: Machine,
}

/// Members written back to back in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructMachine {
    pub name: String,
    pub members: Vec<MemberMachine>,
}

/// Enumeration written as a `uint32` ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMachine {
    pub name: String,
    pub enumerators: Vec<Enumerator>,
}

impl EnumMachine {
    /// Declared ordinal of an enumerator.
    pub fn ordinal_of(&self, name: &str) -> Option<u32> {
        self.enumerators
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.ordinal)
    }

    /// Enumerator declared with `ordinal`.
    pub fn name_of(&self, ordinal: u32) -> Option<&str> {
        self.enumerators
            .iter()
            .find(|e| e.ordinal == ordinal)
            .map(|e| e.name.as_str())
    }

    fn ordinal_for_value(&self, value: &CodecValue) -> Result<u32> {
        let ordinal = match value {
            CodecValue::Enum(name) => self.ordinal_of(name),
            other => other
                .as_i128()
                .and_then(|v| u32::try_from(v).ok())
                .filter(|o| self.name_of(*o).is_some()),
        };
        ordinal.ok_or_else(|| {
            CodecError::type_mismatch(format!("enumerator of '{}'", self.name), describe(value))
        })
    }
}

/// Wire type of a union discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    Primitive(PrimitiveType),
    Enum(EnumMachine),
}

impl Discriminator {
    /// Alignment (and size) of the discriminator on the wire.
    pub fn alignment(&self) -> usize {
        match self {
            Discriminator::Primitive(p) => p.alignment(),
            Discriminator::Enum(_) => 4,
        }
    }

    /// Whether `label` is representable by this discriminator.
    pub fn contains(&self, label: i64) -> bool {
        match self {
            Discriminator::Primitive(PrimitiveType::Bool) => label == 0 || label == 1,
            Discriminator::Primitive(PrimitiveType::Char) => (0..=255).contains(&label),
            Discriminator::Primitive(p) => p
                .integer_range()
                .is_some_and(|(min, max)| (min..=max).contains(&i128::from(label))),
            Discriminator::Enum(e) => u32::try_from(label)
                .ok()
                .and_then(|o| e.name_of(o))
                .is_some(),
        }
    }

    /// Candidate sentinel values in search order.
    ///
    /// bool tries false then true, enums walk their declared enumerators,
    /// integers count up from the type minimum. The caller stops at the
    /// first candidate that is not a case label, so at most
    /// `labels + 1` integer candidates are ever produced.
    pub fn candidates(&self) -> Box<dyn Iterator<Item = i64> + '_> {
        match self {
            Discriminator::Primitive(PrimitiveType::Bool) => Box::new([0, 1].into_iter()),
            Discriminator::Primitive(PrimitiveType::Char) => Box::new(0..=255),
            Discriminator::Primitive(p) => {
                let (min, max) = p.integer_range().unwrap_or((0, -1));
                let min = i64::try_from(min).unwrap_or(i64::MIN);
                let max = i64::try_from(max).unwrap_or(i64::MAX);
                Box::new(min..=max)
            }
            Discriminator::Enum(e) => Box::new(e.enumerators.iter().map(|x| i64::from(x.ordinal))),
        }
    }

    fn write(&self, buf: &mut CdrBuffer, label: i64) -> Result<()> {
        match self {
            Discriminator::Primitive(p) => match p {
                PrimitiveType::Bool
                | PrimitiveType::Char
                | PrimitiveType::UInt8 => buf.write_u8(label as u8),
                PrimitiveType::Int8 => buf.write_i8(label as i8),
                PrimitiveType::Int16 => buf.write_i16(label as i16),
                PrimitiveType::UInt16 => buf.write_u16(label as u16),
                PrimitiveType::Int32 => buf.write_i32(label as i32),
                PrimitiveType::UInt32 => buf.write_u32(label as u32),
                PrimitiveType::Int64 => buf.write_i64(label),
                PrimitiveType::UInt64 => buf.write_u64(label as u64),
                PrimitiveType::Float32 | PrimitiveType::Float64 => {
                    return Err(CodecError::invalid_data(
                        "union discriminator",
                        "floating point discriminator",
                    ))
                }
            },
            Discriminator::Enum(_) => buf.write_u32(label as u32),
        }
        Ok(())
    }

    fn read(&self, buf: &mut CdrBuffer) -> Result<i64> {
        Ok(match self {
            Discriminator::Primitive(p) => match p {
                PrimitiveType::Bool | PrimitiveType::Char | PrimitiveType::UInt8 => {
                    i64::from(buf.read_u8()?)
                }
                PrimitiveType::Int8 => i64::from(buf.read_i8()?),
                PrimitiveType::Int16 => i64::from(buf.read_i16()?),
                PrimitiveType::UInt16 => i64::from(buf.read_u16()?),
                PrimitiveType::Int32 => i64::from(buf.read_i32()?),
                PrimitiveType::UInt32 => i64::from(buf.read_u32()?),
                PrimitiveType::Int64 => buf.read_i64()?,
                PrimitiveType::UInt64 => {
                    let raw = buf.read_u64()?;
                    i64::try_from(raw).map_err(|_| {
                        CodecError::invalid_data("union discriminator", format!("{raw} out of range"))
                    })?
                }
                PrimitiveType::Float32 | PrimitiveType::Float64 => {
                    return Err(CodecError::invalid_data(
                        "union discriminator",
                        "floating point discriminator",
                    ))
                }
            },
            Discriminator::Enum(_) => i64::from(buf.read_u32()?),
        })
    }
}

/// A labelled union case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseMachine {
    pub name: String,
    pub labels: Vec<i64>,
    pub machine: Machine,
}

/// The default arm with its precomputed sentinel discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultMachine {
    pub name: String,
    pub sentinel: i64,
    pub machine: Machine,
}

/// Discriminator followed by the payload of the active case.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionMachine {
    pub name: String,
    pub discriminator: Discriminator,
    pub cases: Vec<CaseMachine>,
    pub default: Option<DefaultMachine>,
    /// Key trees of discriminator-keyed unions skip the payload
    pub discriminator_only: bool,
}

impl UnionMachine {
    /// Case declaring `label`.
    pub fn case_for(&self, label: i64) -> Option<&CaseMachine> {
        self.cases.iter().find(|c| c.labels.contains(&label))
    }

    /// max(discriminator alignment, case alignments) under `prefix`.
    pub fn alignment(&self, prefix: LengthPrefix) -> usize {
        self.cases
            .iter()
            .map(|c| c.machine.alignment(prefix))
            .chain(self.default.iter().map(|d| d.machine.alignment(prefix)))
            .fold(self.discriminator.alignment(), usize::max)
    }

    fn write(&self, buf: &mut CdrBuffer, value: &CodecValue, cx: &WalkContext<'_>) -> Result<()> {
        let CodecValue::Union { label, value } = value else {
            return Err(CodecError::type_mismatch(
                format!("union '{}'", self.name),
                describe(value),
            ));
        };
        buf.align(self.alignment(cx.length_prefix));
        match label {
            Some(label) => {
                let case = self
                    .case_for(*label)
                    .filter(|_| self.discriminator.contains(*label))
                    .ok_or_else(|| CodecError::InvalidDiscriminator {
                        type_name: self.name.clone(),
                        label: *label,
                    })?;
                self.discriminator.write(buf, *label)?;
                if !self.discriminator_only {
                    case.machine
                        .write(buf, value, cx)
                        .map_err(|e| e.in_field(&case.name))?;
                }
            }
            None => {
                let default = self.default.as_ref().ok_or_else(|| {
                    CodecError::type_mismatch(
                        format!("case label of union '{}'", self.name),
                        "default (union has no default case)",
                    )
                })?;
                self.discriminator.write(buf, default.sentinel)?;
                if !self.discriminator_only {
                    default
                        .machine
                        .write(buf, value, cx)
                        .map_err(|e| e.in_field(&default.name))?;
                }
            }
        }
        Ok(())
    }

    fn read(&self, buf: &mut CdrBuffer, cx: &WalkContext<'_>) -> Result<CodecValue> {
        buf.align_read(self.alignment(cx.length_prefix))?;
        let label = self.discriminator.read(buf)?;
        if let Some(case) = self.case_for(label) {
            let value = if self.discriminator_only {
                CodecValue::Null
            } else {
                case.machine.read(buf, cx)?
            };
            return Ok(CodecValue::union_case(label, value));
        }
        match &self.default {
            Some(default) => {
                let value = if self.discriminator_only {
                    CodecValue::Null
                } else {
                    default.machine.read(buf, cx)?
                };
                Ok(CodecValue::union_default(value))
            }
            None => Err(CodecError::invalid_data(
                format!("union '{}'", self.name),
                format!("discriminator {label} selects no case and there is no default"),
            )),
        }
    }

    fn max_size(
        &self,
        finder: &mut MaxSizeFinder,
        cx: &WalkContext<'_>,
        visiting: &mut Vec<(TypeId, MachineRole)>,
    ) -> Result<()> {
        finder.align(self.alignment(cx.length_prefix));
        finder.primitive(self.discriminator.alignment());
        if self.discriminator_only {
            return Ok(());
        }
        let start = finder.clone();
        let branches = self
            .cases
            .iter()
            .map(|c| &c.machine)
            .chain(self.default.iter().map(|d| &d.machine));
        for machine in branches {
            let mut branch = start.clone();
            machine.max_size(&mut branch, cx, visiting)?;
            finder.merge_max(&branch);
        }
        Ok(())
    }
}

/// Codec node for one wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Machine {
    Primitive(PrimitiveType),
    /// `uint32` length including the NUL, bytes, NUL
    String { bound: Option<usize> },
    /// Count prefix then raw bytes
    Bytes { bound: Option<usize> },
    /// Exactly `length` elements, no prefix
    Array { element: Box<Machine>, length: usize },
    /// Count prefix then elements
    Sequence { element: Box<Machine>, bound: Option<usize> },
    /// Count prefix then key/value pairs in insertion order
    Map {
        key: Box<Machine>,
        value: Box<Machine>,
        bound: Option<usize>,
    },
    Enum(EnumMachine),
    Struct(StructMachine),
    Union(Box<UnionMachine>),
    /// One-byte presence flag then the value
    Optional(Box<Machine>),
    TypeRef(TypeRef),
}

impl Machine {
    /// Alignment of the first thing this node writes when counts are
    /// `prefix` wide. Structs, optionals and references align their parts
    /// themselves and report 1.
    pub fn alignment(&self, prefix: LengthPrefix) -> usize {
        match self {
            Machine::Primitive(p) => p.alignment(),
            Machine::String { .. } | Machine::Enum(_) => 4,
            Machine::Bytes { .. } | Machine::Sequence { .. } | Machine::Map { .. } => {
                prefix.width()
            }
            Machine::Array { element, .. } => element.alignment(prefix),
            Machine::Union(u) => u.alignment(prefix),
            Machine::Struct(_) | Machine::Optional(_) | Machine::TypeRef(_) => 1,
        }
    }

    /// Write `value` at the buffer cursor.
    pub fn write(&self, buf: &mut CdrBuffer, value: &CodecValue, cx: &WalkContext<'_>) -> Result<()> {
        match self {
            Machine::Primitive(p) => write_primitive(buf, *p, value),
            Machine::String { bound } => {
                let text = value
                    .as_str()
                    .ok_or_else(|| coerce_error("string", value))?;
                check_bound("string", text.len(), *bound)?;
                let length = u32::try_from(text.len() + 1)
                    .map_err(|_| CodecError::bounds("string", text.len(), u32::MAX as usize - 1))?;
                buf.write_u32(length);
                buf.write_bytes(text.as_bytes());
                buf.write_u8(0);
                Ok(())
            }
            Machine::Bytes { bound } => {
                let bytes: Vec<u8> = match value {
                    CodecValue::Bytes(b) => b.clone(),
                    CodecValue::Array(items) => items
                        .iter()
                        .map(coerce_to_u8)
                        .collect::<Result<_>>()?,
                    other => return Err(coerce_error("bytes", other)),
                };
                check_bound("bytes", bytes.len(), *bound)?;
                write_count(buf, cx.length_prefix, "bytes", bytes.len())?;
                buf.write_bytes(&bytes);
                Ok(())
            }
            Machine::Array { element, length } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| coerce_error("array", value))?;
                if items.len() != *length {
                    return Err(CodecError::type_mismatch(
                        format!("array of {length} elements"),
                        format!("{} elements", items.len()),
                    ));
                }
                for (i, item) in items.iter().enumerate() {
                    element
                        .write(buf, item, cx)
                        .map_err(|e| e.in_field(&format!("[{i}]")))?;
                }
                Ok(())
            }
            Machine::Sequence { element, bound } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| coerce_error("sequence", value))?;
                check_bound("sequence", items.len(), *bound)?;
                write_count(buf, cx.length_prefix, "sequence", items.len())?;
                for (i, item) in items.iter().enumerate() {
                    element
                        .write(buf, item, cx)
                        .map_err(|e| e.in_field(&format!("[{i}]")))?;
                }
                Ok(())
            }
            Machine::Map {
                key,
                value: value_machine,
                bound,
            } => {
                let CodecValue::Map(entries) = value else {
                    return Err(coerce_error("map", value));
                };
                check_bound("map", entries.len(), *bound)?;
                write_count(buf, cx.length_prefix, "map", entries.len())?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    key.write(buf, k, cx)
                        .map_err(|e| e.in_field(&format!("[{i}].key")))?;
                    value_machine
                        .write(buf, v, cx)
                        .map_err(|e| e.in_field(&format!("[{i}].value")))?;
                }
                Ok(())
            }
            Machine::Enum(e) => {
                let ordinal = e.ordinal_for_value(value)?;
                buf.write_u32(ordinal);
                Ok(())
            }
            Machine::Struct(s) => {
                let fields = value
                    .as_struct()
                    .ok_or_else(|| coerce_error(&format!("struct '{}'", s.name), value))?;
                for member in &s.members {
                    let field = fields.get(&member.name).ok_or_else(|| CodecError::MissingMember {
                        type_name: s.name.clone(),
                        member: member.name.clone(),
                    })?;
                    member
                        .machine
                        .write(buf, field, cx)
                        .map_err(|e| e.in_field(&member.name))?;
                }
                Ok(())
            }
            Machine::Union(u) => u.write(buf, value, cx),
            Machine::Optional(inner) => {
                if value.is_null() {
                    buf.write_u8(0);
                    Ok(())
                } else {
                    buf.write_u8(1);
                    inner.write(buf, value, cx)
                }
            }
            Machine::TypeRef(r) => {
                let inner = cx.descend(&r.name)?;
                inner.types.machine(r.id, r.role)?.write(buf, value, &inner)
            }
        }
    }

    /// Read one value at the buffer cursor.
    pub fn read(&self, buf: &mut CdrBuffer, cx: &WalkContext<'_>) -> Result<CodecValue> {
        match self {
            Machine::Primitive(p) => read_primitive(buf, *p),
            Machine::String { bound } => {
                let length = buf.read_u32()? as usize;
                if length == 0 {
                    return Err(CodecError::invalid_data(
                        "string",
                        "length 0 leaves no room for the terminator",
                    ));
                }
                if let Some(bound) = bound {
                    if length - 1 > *bound {
                        return Err(CodecError::invalid_data(
                            "string",
                            format!("length {} exceeds bound {bound}", length - 1),
                        ));
                    }
                }
                let raw = buf.read_bytes(length)?;
                let (text, terminator) = raw.split_at(length - 1);
                if terminator.first() != Some(&0) {
                    return Err(CodecError::invalid_data("string", "missing NUL terminator"));
                }
                let text = std::str::from_utf8(text)
                    .map_err(|e| CodecError::invalid_data("string", e.to_string()))?;
                Ok(CodecValue::String(text.to_string()))
            }
            Machine::Bytes { bound } => {
                let count = read_count(buf, cx.length_prefix, "bytes", *bound)?;
                Ok(CodecValue::Bytes(buf.read_bytes(count)?.to_vec()))
            }
            Machine::Array { element, length } => {
                let mut items = Vec::with_capacity((*length).min(buf.remaining()));
                for _ in 0..*length {
                    items.push(element.read(buf, cx)?);
                }
                Ok(CodecValue::Array(items))
            }
            Machine::Sequence { element, bound } => {
                let count = read_count(buf, cx.length_prefix, "sequence", *bound)?;
                let mut items = Vec::with_capacity(count.min(buf.remaining()));
                for _ in 0..count {
                    items.push(element.read(buf, cx)?);
                }
                Ok(CodecValue::Array(items))
            }
            Machine::Map { key, value, bound } => {
                let count = read_count(buf, cx.length_prefix, "map", *bound)?;
                let mut entries = Vec::with_capacity(count.min(buf.remaining()));
                for _ in 0..count {
                    let k = key.read(buf, cx)?;
                    let v = value.read(buf, cx)?;
                    entries.push((k, v));
                }
                Ok(CodecValue::Map(entries))
            }
            Machine::Enum(e) => {
                let ordinal = buf.read_u32()?;
                let name = e.name_of(ordinal).ok_or_else(|| {
                    CodecError::invalid_data(
                        format!("enum '{}'", e.name),
                        format!("undeclared ordinal {ordinal}"),
                    )
                })?;
                Ok(CodecValue::Enum(name.to_string()))
            }
            Machine::Struct(s) => {
                let mut fields = DecodedMessage::with_capacity(s.members.len());
                for member in &s.members {
                    let value = member.machine.read(buf, cx)?;
                    fields.insert(member.name.clone(), value);
                }
                Ok(CodecValue::Struct(fields))
            }
            Machine::Union(u) => u.read(buf, cx),
            Machine::Optional(inner) => match buf.read_u8()? {
                0 => Ok(CodecValue::Null),
                1 => inner.read(buf, cx),
                flag => Err(CodecError::invalid_data(
                    "optional",
                    format!("presence flag {flag}"),
                )),
            },
            Machine::TypeRef(r) => {
                let inner = cx.descend(&r.name)?;
                inner.types.machine(r.id, r.role)?.read(buf, &inner)
            }
        }
    }

    /// Push `finder` forward by the largest encoding this node can produce.
    ///
    /// `visiting` holds the references on the current path; reaching one
    /// of them again means the size is unbounded.
    pub fn max_size(
        &self,
        finder: &mut MaxSizeFinder,
        cx: &WalkContext<'_>,
        visiting: &mut Vec<(TypeId, MachineRole)>,
    ) -> Result<()> {
        if finder.is_unbounded() {
            return Ok(());
        }
        match self {
            Machine::Primitive(p) => finder.primitive(p.size()),
            Machine::String { bound } => {
                finder.primitive(4);
                finder.skip(bound.unwrap_or(cx.max_unbounded_length));
                finder.skip(1);
            }
            Machine::Bytes { bound } => {
                finder.primitive(cx.length_prefix.width());
                finder.skip(bound.unwrap_or(cx.max_unbounded_length));
            }
            Machine::Array { element, length } => {
                finder.repeat(*length, |f| element.max_size(f, cx, visiting))?;
            }
            Machine::Sequence { element, bound } => {
                finder.primitive(cx.length_prefix.width());
                let count = bound.unwrap_or(cx.max_unbounded_length);
                finder.repeat(count, |f| element.max_size(f, cx, visiting))?;
            }
            Machine::Map { key, value, bound } => {
                finder.primitive(cx.length_prefix.width());
                let count = bound.unwrap_or(cx.max_unbounded_length);
                finder.repeat(count, |f| {
                    key.max_size(f, cx, visiting)?;
                    value.max_size(f, cx, visiting)
                })?;
            }
            Machine::Enum(_) => finder.primitive(4),
            Machine::Struct(s) => {
                for member in &s.members {
                    member.machine.max_size(finder, cx, visiting)?;
                }
            }
            Machine::Union(u) => u.max_size(finder, cx, visiting)?,
            Machine::Optional(inner) => {
                finder.skip(1);
                inner.max_size(finder, cx, visiting)?;
            }
            Machine::TypeRef(r) => {
                let entry = (r.id, r.role);
                // a chain deeper than the limit can never be written either
                let Ok(inner) = cx.descend(&r.name) else {
                    finder.saturate();
                    return Ok(());
                };
                if visiting.contains(&entry) {
                    finder.saturate();
                    return Ok(());
                }
                visiting.push(entry);
                let result = inner
                    .types
                    .machine(r.id, r.role)
                    .and_then(|m| m.max_size(finder, &inner, visiting));
                visiting.pop();
                result?;
            }
        }
        Ok(())
    }
}

fn check_bound(member: &str, length: usize, bound: Option<usize>) -> Result<()> {
    match bound {
        Some(bound) if length > bound => Err(CodecError::bounds(member, length, bound)),
        _ => Ok(()),
    }
}

fn write_count(buf: &mut CdrBuffer, prefix: LengthPrefix, member: &str, count: usize) -> Result<()> {
    if count > prefix.max_count() {
        return Err(CodecError::bounds(member, count, prefix.max_count()));
    }
    match prefix {
        LengthPrefix::U16 => buf.write_u16(count as u16),
        LengthPrefix::U32 => buf.write_u32(count as u32),
    }
    Ok(())
}

fn read_count(
    buf: &mut CdrBuffer,
    prefix: LengthPrefix,
    context: &str,
    bound: Option<usize>,
) -> Result<usize> {
    let count = match prefix {
        LengthPrefix::U16 => usize::from(buf.read_u16()?),
        LengthPrefix::U32 => buf.read_u32()? as usize,
    };
    if let Some(bound) = bound {
        if count > bound {
            return Err(CodecError::invalid_data(
                context,
                format!("count {count} exceeds bound {bound}"),
            ));
        }
    }
    Ok(count)
}

fn write_primitive(buf: &mut CdrBuffer, primitive: PrimitiveType, value: &CodecValue) -> Result<()> {
    match primitive {
        PrimitiveType::Bool => match value {
            CodecValue::Bool(b) => buf.write_u8(u8::from(*b)),
            other => return Err(coerce_error("bool", other)),
        },
        PrimitiveType::Char => buf.write_u8(coerce_to_char(value)?),
        PrimitiveType::Float32 => buf.write_f32(coerce_to_f64("float32", value)? as f32),
        PrimitiveType::Float64 => buf.write_f64(coerce_to_f64("float64", value)?),
        integer => {
            let name = integer.name();
            let wide = value.as_i128().ok_or_else(|| coerce_error(name, value))?;
            let overflow = |_| overflow_error(name, value);
            match integer {
                PrimitiveType::Int8 => buf.write_i8(i8::try_from(wide).map_err(overflow)?),
                PrimitiveType::UInt8 => buf.write_u8(u8::try_from(wide).map_err(overflow)?),
                PrimitiveType::Int16 => buf.write_i16(i16::try_from(wide).map_err(overflow)?),
                PrimitiveType::UInt16 => buf.write_u16(u16::try_from(wide).map_err(overflow)?),
                PrimitiveType::Int32 => buf.write_i32(i32::try_from(wide).map_err(overflow)?),
                PrimitiveType::UInt32 => buf.write_u32(u32::try_from(wide).map_err(overflow)?),
                PrimitiveType::Int64 => buf.write_i64(i64::try_from(wide).map_err(overflow)?),
                _ => buf.write_u64(u64::try_from(wide).map_err(overflow)?),
            }
        }
    }
    Ok(())
}

fn read_primitive(buf: &mut CdrBuffer, primitive: PrimitiveType) -> Result<CodecValue> {
    Ok(match primitive {
        PrimitiveType::Bool => match buf.read_u8()? {
            0 => CodecValue::Bool(false),
            1 => CodecValue::Bool(true),
            other => {
                return Err(CodecError::invalid_data(
                    "bool",
                    format!("byte {other} is neither 0 nor 1"),
                ))
            }
        },
        PrimitiveType::Char => CodecValue::Char(char::from(buf.read_u8()?)),
        PrimitiveType::Int8 => CodecValue::Int8(buf.read_i8()?),
        PrimitiveType::UInt8 => CodecValue::UInt8(buf.read_u8()?),
        PrimitiveType::Int16 => CodecValue::Int16(buf.read_i16()?),
        PrimitiveType::UInt16 => CodecValue::UInt16(buf.read_u16()?),
        PrimitiveType::Int32 => CodecValue::Int32(buf.read_i32()?),
        PrimitiveType::UInt32 => CodecValue::UInt32(buf.read_u32()?),
        PrimitiveType::Int64 => CodecValue::Int64(buf.read_i64()?),
        PrimitiveType::UInt64 => CodecValue::UInt64(buf.read_u64()?),
        PrimitiveType::Float32 => CodecValue::Float32(buf.read_f32()?),
        PrimitiveType::Float64 => CodecValue::Float64(buf.read_f64()?),
    })
}

fn coerce_to_char(value: &CodecValue) -> Result<u8> {
    match value {
        CodecValue::Char(c) => u8::try_from(u32::from(*c)).map_err(|_| overflow_error("char", value)),
        CodecValue::UInt8(u) => Ok(*u),
        other => Err(coerce_error("char", other)),
    }
}

fn coerce_to_u8(value: &CodecValue) -> Result<u8> {
    let wide = value.as_i128().ok_or_else(|| coerce_error("uint8", value))?;
    u8::try_from(wide).map_err(|_| overflow_error("uint8", value))
}

fn coerce_to_f64(expected: &str, value: &CodecValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| coerce_error(expected, value))
}

/// Create an overflow error for values that don't fit in the target type.
fn overflow_error(expected: &str, actual: &CodecValue) -> CodecError {
    CodecError::type_mismatch(expected, format!("{actual:?} (out of range)"))
}

/// Create a coercion error for incompatible types.
fn coerce_error(expected: &str, actual: &CodecValue) -> CodecError {
    CodecError::type_mismatch(expected, describe(actual))
}

fn describe(value: &CodecValue) -> String {
    value.kind().to_string()
}

/// Lookup for trees without references.
#[cfg(test)]
pub(crate) struct NoTypes;

#[cfg(test)]
impl MachineLookup for NoTypes {
    fn machine(&self, id: TypeId, _role: MachineRole) -> Result<&Machine> {
        Err(CodecError::type_not_found(format!("#{id}")))
    }
}

#[cfg(test)]
impl<'a> WalkContext<'a> {
    pub(crate) fn standalone(types: &'a dyn MachineLookup) -> Self {
        Self {
            types,
            length_prefix: LengthPrefix::U16,
            max_unbounded_length: crate::core::DEFAULT_MAX_UNBOUNDED_LENGTH,
            depth_budget: crate::core::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Map lookup for tests that need references.
#[cfg(test)]
pub(crate) struct FixedTypes(pub HashMap<(TypeId, MachineRole), Machine>);

#[cfg(test)]
impl MachineLookup for FixedTypes {
    fn machine(&self, id: TypeId, role: MachineRole) -> Result<&Machine> {
        self.0
            .get(&(id, role))
            .ok_or_else(|| CodecError::type_not_found(format!("#{id}")))
    }
}

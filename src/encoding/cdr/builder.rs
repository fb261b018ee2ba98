// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Machine construction from declared types.
//!
//! Each declared type yields three trees, built once and cached by the
//! registry:
//!
//! - the full machine, used for samples
//! - the member-key machine, used when the type is reached along a key path
//! - the key machine, used for the type's own instance key
//!
//! A reference to another type only needs that type to be *registered*, not
//! built, because references are indices into the registry. When the name
//! is not registered yet the build stops with [`BuildError::Defer`] and the
//! registry retries once the name shows up.

use std::collections::HashSet;

use tracing::trace;

use crate::core::CodecError;
use crate::schema::{DeclaredType, EnumShape, Member, Shape, TypeBody, UnionShape};

use super::machine::{
    CaseMachine, DefaultMachine, Discriminator, EnumMachine, Machine, MachineRole, MemberMachine,
    StructMachine, TypeId, TypeRef, UnionMachine,
};

/// Why a build did not produce machines.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A referenced name is not registered yet
    Defer(String),
    /// The declaration can never be built
    Fatal(CodecError),
}

impl From<CodecError> for BuildError {
    fn from(err: CodecError) -> Self {
        BuildError::Fatal(err)
    }
}

type BuildResult<T> = std::result::Result<T, BuildError>;

/// Name lookup for references.
pub trait TypeResolver {
    /// Index and declaration of a registered type.
    fn resolve(&self, name: &str) -> Option<(TypeId, &DeclaredType)>;
}

/// The machines of one declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltType {
    pub machine: Machine,
    pub member_key_machine: Machine,
    pub key_machine: Machine,
}

/// Build every machine of `decl`.
pub fn build_type<R>(decl: &DeclaredType, resolver: &R) -> BuildResult<BuiltType>
where
    R: TypeResolver + ?Sized,
{
    let builder = Builder {
        resolver,
        type_name: &decl.name,
    };

    let (machine, member_key_machine) = match &decl.body {
        TypeBody::Struct { members } => {
            let full = builder.structure(members, MachineRole::Full, |_| true)?;
            let key = if decl.has_explicit_keys() {
                builder.structure(members, MachineRole::Key, |m| decl.is_key_member(&m.name))?
            } else {
                builder.structure(members, MachineRole::Key, |_| true)?
            };
            (full, key)
        }
        TypeBody::Union(shape) => (
            Machine::Union(Box::new(builder.union(shape, MachineRole::Full)?)),
            Machine::Union(Box::new(builder.union(shape, MachineRole::Key)?)),
        ),
        TypeBody::Enum(shape) => {
            let machine = Machine::Enum(builder.enumeration(&decl.name, shape)?);
            (machine.clone(), machine)
        }
    };

    let key_machine = match &decl.key_members {
        Some(keys) if keys.is_empty() => Machine::Struct(StructMachine {
            name: decl.name.clone(),
            members: Vec::new(),
        }),
        _ => member_key_machine.clone(),
    };

    trace!(
        context = "build",
        type_name = %decl.name,
        key_members = ?decl.key_members,
        "Built machines"
    );

    Ok(BuiltType {
        machine,
        member_key_machine,
        key_machine,
    })
}

struct Builder<'a, R: ?Sized> {
    resolver: &'a R,
    type_name: &'a str,
}

impl<R: TypeResolver + ?Sized> Builder<'_, R> {
    fn unencodable(&self, reason: impl Into<String>) -> BuildError {
        BuildError::Fatal(CodecError::unencodable(self.type_name, reason))
    }

    fn structure(
        &self,
        members: &[Member],
        role: MachineRole,
        include: impl Fn(&Member) -> bool,
    ) -> BuildResult<Machine> {
        let members = members
            .iter()
            .filter(|m| include(m))
            .map(|m| {
                Ok(MemberMachine {
                    name: m.name.clone(),
                    machine: self.shape(&m.shape, role)?,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Machine::Struct(StructMachine {
            name: self.type_name.to_string(),
            members,
        }))
    }

    fn shape(&self, shape: &Shape, role: MachineRole) -> BuildResult<Machine> {
        Ok(match shape {
            Shape::Primitive { primitive } => Machine::Primitive(*primitive),
            Shape::String { bound } => Machine::String { bound: *bound },
            Shape::Bytes { bound } => Machine::Bytes { bound: *bound },
            Shape::Array { element, length } => Machine::Array {
                element: Box::new(self.shape(element, role)?),
                length: *length,
            },
            Shape::Sequence { element, bound } => Machine::Sequence {
                element: Box::new(self.shape(element, role)?),
                bound: *bound,
            },
            Shape::Map { key, value, bound } => Machine::Map {
                key: Box::new(self.shape(key, role)?),
                value: Box::new(self.shape(value, role)?),
                bound: *bound,
            },
            Shape::Enum(e) => Machine::Enum(self.enumeration(self.type_name, e)?),
            Shape::Union(u) => Machine::Union(Box::new(self.union(u, role)?)),
            Shape::Optional { inner } => Machine::Optional(Box::new(self.shape(inner, role)?)),
            Shape::Named { name } => {
                let (id, _) = self
                    .resolver
                    .resolve(name)
                    .ok_or_else(|| BuildError::Defer(name.clone()))?;
                Machine::TypeRef(TypeRef {
                    name: name.clone(),
                    id,
                    role,
                })
            }
        })
    }

    fn enumeration(&self, name: &str, shape: &EnumShape) -> BuildResult<EnumMachine> {
        if shape.enumerators.is_empty() {
            return Err(self.unencodable(format!("enum '{name}' has no enumerators")));
        }
        let mut names = HashSet::new();
        let mut ordinals = HashSet::new();
        for e in &shape.enumerators {
            if !names.insert(e.name.as_str()) {
                return Err(self.unencodable(format!("duplicate enumerator '{}'", e.name)));
            }
            if !ordinals.insert(e.ordinal) {
                return Err(self.unencodable(format!("duplicate ordinal {}", e.ordinal)));
            }
        }
        Ok(EnumMachine {
            name: name.to_string(),
            enumerators: shape.enumerators.clone(),
        })
    }

    fn discriminator(&self, shape: &Shape) -> BuildResult<Discriminator> {
        match shape {
            Shape::Primitive { primitive } if primitive.is_discriminator() => {
                Ok(Discriminator::Primitive(*primitive))
            }
            Shape::Enum(e) => Ok(Discriminator::Enum(self.enumeration(self.type_name, e)?)),
            Shape::Named { name } => {
                let (_, decl) = self
                    .resolver
                    .resolve(name)
                    .ok_or_else(|| BuildError::Defer(name.clone()))?;
                match &decl.body {
                    TypeBody::Enum(e) => Ok(Discriminator::Enum(self.enumeration(name, e)?)),
                    _ => Err(self.unencodable(format!(
                        "discriminator '{name}' is not an enum"
                    ))),
                }
            }
            other => Err(self.unencodable(format!(
                "{} cannot be a union discriminator",
                other.describe()
            ))),
        }
    }

    fn union(&self, shape: &UnionShape, role: MachineRole) -> BuildResult<UnionMachine> {
        let discriminator = self.discriminator(&shape.discriminator)?;
        if shape.cases.is_empty() && shape.default.is_none() {
            return Err(self.unencodable("union declares no cases"));
        }

        let mut labels = HashSet::new();
        for case in &shape.cases {
            if case.labels.is_empty() {
                return Err(self.unencodable(format!("case '{}' has no labels", case.name)));
            }
            for label in &case.labels {
                if !discriminator.contains(*label) {
                    return Err(self.unencodable(format!(
                        "label {label} of case '{}' is outside the discriminator range",
                        case.name
                    )));
                }
                if !labels.insert(*label) {
                    return Err(self.unencodable(format!("duplicate case label {label}")));
                }
            }
        }

        let cases = shape
            .cases
            .iter()
            .map(|case| {
                Ok(CaseMachine {
                    name: case.name.clone(),
                    labels: case.labels.clone(),
                    machine: self.shape(&case.shape, role)?,
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        let default = match &shape.default {
            Some(default) => {
                let sentinel = discriminator
                    .candidates()
                    .find(|candidate| !labels.contains(candidate))
                    .ok_or_else(|| CodecError::UnionDomainExhausted {
                        type_name: self.type_name.to_string(),
                    })?;
                trace!(
                    context = "build",
                    type_name = %self.type_name,
                    sentinel,
                    "Chose default discriminator"
                );
                Some(DefaultMachine {
                    name: default.name.clone(),
                    sentinel,
                    machine: self.shape(&default.shape, role)?,
                })
            }
            None => None,
        };

        Ok(UnionMachine {
            name: self.type_name.to_string(),
            discriminator,
            cases,
            default,
            discriminator_only: role == MachineRole::Key && shape.key_discriminator,
        })
    }
}

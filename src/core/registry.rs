// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Type registry with deferred resolution.
//!
//! Declared types may be registered in any order. A type that references a
//! name nobody registered yet is kept waiting on that name and rebuilt when
//! the name arrives, so mutually recursive declarations need no
//! topological pre-sort. Only *use* of a type whose closure is still
//! incomplete fails, naming every missing reference.
//!
//! The registry is an explicit object; create as many independent ones as
//! needed and share each behind an [`Arc`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace, warn};

use super::config::{CodecConfig, Endianness};
use super::error::{CodecError, Result};
use super::value::CodecValue;
use crate::encoding::cdr::buffer::CdrBuffer;
use crate::encoding::cdr::builder::{build_type, BuildError, BuiltType, TypeResolver};
use crate::encoding::cdr::calculator::MaxSizeFinder;
use crate::encoding::cdr::codec::{self, TypeSupport};
use crate::encoding::cdr::keyhash::{pad_key, KeyHash, KeyHashMode};
use crate::encoding::cdr::machine::{Machine, MachineLookup, MachineRole, TypeId, WalkContext};
use crate::schema::DeclaredType;

/// Opaque reference to a registered type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    id: TypeId,
    name: String,
}

impl TypeHandle {
    /// Fully-qualified type name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A type waiting on a name that is not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingType {
    pub type_name: String,
    pub waiting_on: String,
}

enum EntryState {
    /// Build stopped at this unregistered name
    Waiting(String),
    Built(BuiltType),
    /// A retry hit an error that no registration can fix
    Broken(CodecError),
}

struct TypeEntry {
    decl: DeclaredType,
    state: EntryState,
    /// Set once the type's whole closure is built
    max_key_size: OnceLock<usize>,
}

/// Registered declarations and their machines.
pub(crate) struct Catalog {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, TypeId>,
    /// Unregistered name -> types whose build stopped on it
    waiting: HashMap<String, Vec<TypeId>>,
}

impl TypeResolver for Catalog {
    fn resolve(&self, name: &str) -> Option<(TypeId, &DeclaredType)> {
        let id = *self.by_name.get(name)?;
        Some((id, &self.entries[id].decl))
    }
}

impl MachineLookup for Catalog {
    fn machine(&self, id: TypeId, role: MachineRole) -> Result<&Machine> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| CodecError::type_not_found(format!("#{id}")))?;
        match &entry.state {
            EntryState::Built(built) => Ok(match role {
                MachineRole::Full => &built.machine,
                MachineRole::Key => &built.member_key_machine,
            }),
            EntryState::Waiting(name) => Err(CodecError::unresolved(
                entry.decl.name.clone(),
                vec![name.clone()],
            )),
            EntryState::Broken(err) => Err(err.clone()),
        }
    }
}

impl Catalog {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            waiting: HashMap::new(),
        }
    }

    fn handle(&self, id: TypeId) -> TypeHandle {
        TypeHandle {
            id,
            name: self.entries[id].decl.name.clone(),
        }
    }

    fn entry(&self, handle: &TypeHandle) -> Result<&TypeEntry> {
        self.entries
            .get(handle.id)
            .filter(|e| e.decl.name == handle.name)
            .ok_or_else(|| CodecError::type_not_found(handle.name.clone()))
    }

    /// Build (or rebuild) one entry. Fatal build errors are returned and
    /// leave the entry state untouched.
    fn try_build(&mut self, id: TypeId) -> Result<()> {
        let outcome = build_type(&self.entries[id].decl, &*self);
        let type_name = &self.entries[id].decl.name;
        match outcome {
            Ok(built) => {
                debug!(context = "register", type_name = %type_name, "Type resolved");
                self.entries[id].state = EntryState::Built(built);
                Ok(())
            }
            Err(BuildError::Defer(missing)) => {
                debug!(
                    context = "register",
                    type_name = %type_name,
                    waiting_on = %missing,
                    "Type waits on unregistered name"
                );
                self.waiting.entry(missing.clone()).or_default().push(id);
                self.entries[id].state = EntryState::Waiting(missing);
                Ok(())
            }
            Err(BuildError::Fatal(err)) => Err(err),
        }
    }

    /// Retry every type that was waiting on `name`. Returns their ids.
    fn wake(&mut self, name: &str) -> Vec<TypeId> {
        let waiters = self.waiting.remove(name).unwrap_or_default();
        for &id in &waiters {
            trace!(
                context = "register",
                type_name = %self.entries[id].decl.name,
                registered = %name,
                "Retrying deferred type"
            );
            if let Err(err) = self.try_build(id) {
                warn!(
                    context = "register",
                    type_name = %self.entries[id].decl.name,
                    error = %err,
                    "Deferred type can no longer be built"
                );
                self.entries[id].state = EntryState::Broken(err);
            }
        }
        waiters
    }

    /// Check that `id` and everything it reaches is built.
    fn check_closure(&self, id: TypeId) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let entry = &self.entries[current];
            match &entry.state {
                EntryState::Broken(err) => return Err(err.clone()),
                EntryState::Waiting(name) if self.by_name.contains_key(name) => {
                    return Err(CodecError::unresolved(
                        entry.decl.name.clone(),
                        vec![name.clone()],
                    ));
                }
                _ => {}
            }
            for name in entry.decl.referenced_names() {
                match self.by_name.get(name) {
                    Some(&next) => stack.push(next),
                    None if !missing.iter().any(|m| m == name) => missing.push(name.to_string()),
                    None => {}
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CodecError::unresolved(
                self.entries[id].decl.name.clone(),
                missing,
            ))
        }
    }

    /// Make sure `id` is usable and return its max key size, computing it
    /// on first success.
    fn ensure_resolved(&self, id: TypeId, config: &CodecConfig) -> Result<usize> {
        if let Some(size) = self.entries[id].max_key_size.get() {
            return Ok(*size);
        }
        self.check_closure(id)?;

        let cx = walk_context(self, config);
        let mut finder = MaxSizeFinder::new();
        let key_machine = self.key_machine(id)?;
        key_machine.max_size(&mut finder, &cx, &mut Vec::new())?;
        let size = finder.size();

        let entry = &self.entries[id];
        if entry.max_key_size.set(size).is_ok() {
            debug!(
                context = "max_key_size",
                type_name = %entry.decl.name,
                max_key_size = size,
                keyhash_mode = %KeyHashMode::for_max_key_size(size),
                "Computed max key size"
            );
        }
        Ok(size)
    }

    fn key_machine(&self, id: TypeId) -> Result<&Machine> {
        match &self.entries[id].state {
            EntryState::Built(built) => Ok(&built.key_machine),
            _ => self.machine(id, MachineRole::Key),
        }
    }
}

fn walk_context<'a>(catalog: &'a Catalog, config: &CodecConfig) -> WalkContext<'a> {
    WalkContext {
        types: catalog,
        length_prefix: config.length_prefix,
        max_unbounded_length: config.max_unbounded_length,
        depth_budget: config.max_depth,
    }
}

/// Thread-safe registry of declared types and their machines.
///
/// Uses RwLock for concurrent read access with exclusive write access;
/// machines are immutable once built, so any number of threads may encode
/// and decode while no registration is in progress.
pub struct TypeRegistry {
    config: CodecConfig,
    inner: RwLock<Catalog>,
}

impl TypeRegistry {
    /// Create a new empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Create a new empty registry.
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Catalog::new()),
        }
    }

    /// Configuration shared by every type of this registry.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Catalog>> {
        self.inner
            .read()
            .map_err(|e| CodecError::Other(format!("Registry lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Catalog>> {
        self.inner
            .write()
            .map_err(|e| CodecError::Other(format!("Registry lock poisoned: {e}")))
    }

    /// Register a declared type.
    ///
    /// Referencing unregistered names is allowed; the type becomes usable
    /// once they are registered. Registering an identical declaration again
    /// returns the existing handle.
    pub fn register(&self, decl: DeclaredType) -> Result<TypeHandle> {
        decl.validate()?;
        let mut catalog = self.write()?;

        if let Some(&id) = catalog.by_name.get(&decl.name) {
            if catalog.entries[id].decl == decl {
                trace!(context = "register", type_name = %decl.name, "Already registered");
                return Ok(catalog.handle(id));
            }
            return Err(CodecError::invalid_schema(
                &decl.name,
                "already registered with a different declaration",
            ));
        }

        let name = decl.name.clone();
        let id = catalog.entries.len();
        catalog.entries.push(TypeEntry {
            decl,
            state: EntryState::Waiting(String::new()),
            max_key_size: OnceLock::new(),
        });
        catalog.by_name.insert(name.clone(), id);

        if let Err(err) = catalog.try_build(id) {
            catalog.entries.pop();
            catalog.by_name.remove(&name);
            warn!(
                context = "register",
                type_name = %name,
                fields = ?err.log_fields(),
                "Rejected declaration"
            );
            return Err(err);
        }

        let woken = catalog.wake(&name);
        debug!(
            context = "register",
            type_name = %name,
            retried = woken.len(),
            "Registered type"
        );

        // Key sizes are computed as soon as a closure completes; types that
        // are still incomplete are sized lazily on first use.
        for ready in std::iter::once(id).chain(woken) {
            if let Err(err) = catalog.ensure_resolved(ready, &self.config) {
                trace!(
                    context = "register",
                    type_name = %catalog.entries[ready].decl.name,
                    error = %err,
                    "Not resolvable yet"
                );
            }
        }

        Ok(catalog.handle(id))
    }

    /// Register declarations in order, stopping at the first rejected one.
    pub fn register_all<I>(&self, decls: I) -> Result<Vec<TypeHandle>>
    where
        I: IntoIterator<Item = DeclaredType>,
    {
        decls.into_iter().map(|decl| self.register(decl)).collect()
    }

    /// Register a declared type and bind a façade to it.
    pub fn register_support(self: &Arc<Self>, decl: DeclaredType) -> Result<TypeSupport> {
        let handle = self.register(decl)?;
        Ok(self.support(&handle))
    }

    /// Bind a façade to an already registered type.
    pub fn support(self: &Arc<Self>, handle: &TypeHandle) -> TypeSupport {
        TypeSupport::new(Arc::clone(self), handle.clone(), self.config.initial_capacity)
    }

    /// Handle of a registered type.
    pub fn handle(&self, name: &str) -> Result<TypeHandle> {
        let catalog = self.read()?;
        let id = *catalog
            .by_name
            .get(name)
            .ok_or_else(|| CodecError::type_not_found(name))?;
        Ok(catalog.handle(id))
    }

    /// Check if a type is registered.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.by_name.contains_key(name))
    }

    /// Get all registered type names, in registration order.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .map(|e| e.decl.name.clone())
            .collect())
    }

    /// Get the number of registered types.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every registered type still waiting on an unregistered name.
    pub fn pending(&self) -> Result<Vec<PendingType>> {
        let catalog = self.read()?;
        Ok(catalog
            .entries
            .iter()
            .filter_map(|e| match &e.state {
                EntryState::Waiting(name) => Some(PendingType {
                    type_name: e.decl.name.clone(),
                    waiting_on: name.clone(),
                }),
                _ => None,
            })
            .collect())
    }

    /// Serialize a full sample in the configured byte order.
    pub fn serialize(&self, handle: &TypeHandle, value: &CodecValue) -> Result<Vec<u8>> {
        self.serialize_with(handle, value, self.config.endianness)
    }

    /// Serialize a full sample in the given byte order.
    pub fn serialize_with(
        &self,
        handle: &TypeHandle,
        value: &CodecValue,
        endianness: Endianness,
    ) -> Result<Vec<u8>> {
        let catalog = self.read()?;
        catalog.entry(handle)?;
        catalog.ensure_resolved(handle.id, &self.config)?;
        let machine = catalog.machine(handle.id, MachineRole::Full)?;
        codec::encode_sample(
            machine,
            value,
            &walk_context(&catalog, &self.config),
            endianness,
            self.config.initial_capacity,
        )
    }

    /// Decode a full sample, honoring the byte order in its header.
    pub fn deserialize(&self, handle: &TypeHandle, bytes: &[u8]) -> Result<CodecValue> {
        let catalog = self.read()?;
        catalog.entry(handle)?;
        catalog.ensure_resolved(handle.id, &self.config)?;
        let machine = catalog.machine(handle.id, MachineRole::Full)?;
        codec::decode_sample(machine, bytes, &walk_context(&catalog, &self.config))
    }

    /// Instance key, right-padded with zeros to at least 16 bytes.
    pub fn key(&self, handle: &TypeHandle, value: &CodecValue) -> Result<Vec<u8>> {
        let mut buf = CdrBuffer::with_capacity(self.config.initial_capacity);
        Ok(pad_key(self.key_into(handle, value, &mut buf)?))
    }

    /// 16-byte keyhash: the padded key when it always fits, else its MD5.
    pub fn keyhash(&self, handle: &TypeHandle, value: &CodecValue) -> Result<KeyHash> {
        let mut buf = CdrBuffer::with_capacity(self.config.initial_capacity);
        self.keyhash_into(handle, value, &mut buf)
    }

    /// Decode key bytes (padded or not) into a value holding key members.
    pub fn deserialize_key(&self, handle: &TypeHandle, bytes: &[u8]) -> Result<CodecValue> {
        let catalog = self.read()?;
        catalog.entry(handle)?;
        catalog.ensure_resolved(handle.id, &self.config)?;
        let machine = catalog.key_machine(handle.id)?;
        codec::decode_key(machine, bytes, &walk_context(&catalog, &self.config))
    }

    /// Worst-case unpadded key size.
    pub fn max_key_size(&self, handle: &TypeHandle) -> Result<usize> {
        let catalog = self.read()?;
        catalog.entry(handle)?;
        catalog.ensure_resolved(handle.id, &self.config)
    }

    /// Whether keyhashes of this type are raw keys or digests.
    pub fn keyhash_mode(&self, handle: &TypeHandle) -> Result<KeyHashMode> {
        Ok(KeyHashMode::for_max_key_size(self.max_key_size(handle)?))
    }

    /// Encode the unpadded key into a caller-provided buffer.
    pub(crate) fn key_into(
        &self,
        handle: &TypeHandle,
        value: &CodecValue,
        buf: &mut CdrBuffer,
    ) -> Result<Vec<u8>> {
        let catalog = self.read()?;
        catalog.entry(handle)?;
        catalog.ensure_resolved(handle.id, &self.config)?;
        let machine = catalog.key_machine(handle.id)?;
        codec::encode_key(machine, value, &walk_context(&catalog, &self.config), buf)
    }

    pub(crate) fn keyhash_into(
        &self,
        handle: &TypeHandle,
        value: &CodecValue,
        buf: &mut CdrBuffer,
    ) -> Result<KeyHash> {
        let key = self.key_into(handle, value, buf)?;
        let mode = self.keyhash_mode(handle)?;
        Ok(KeyHash::from_key(&key, mode))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

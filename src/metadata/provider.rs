//! The registry: a cache from raw handles to metadata objects.
//!
//! # Architecture
//!
//! Every metadata object is materialized on first request and cached under its canonical handle
//! (see [`crate::metadata::comparer`]). Entries are grouped into one bucket per module. A bucket
//! holds only a weak reference to its module, and metadata objects refer to their module weakly
//! as well, so the cache never keeps a module resident. Once the last strong reference to a module
//! is dropped its bucket is dead; [`MetadataProvider::sweep`] removes dead buckets and runs
//! periodically on lookups and on every registration.
//!
//! Materialization happens outside of any map lock. Two threads racing on the same handle both
//! build an object, and the first insert wins; the loser's object is dropped and both callers
//! receive the winner.
//!
//! # Thread Safety
//!
//! [`MetadataProvider`] is `Send + Sync` and cheap to clone. Module registration, lookups and
//! sweeps can run concurrently.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock, RwLock, Weak,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    metadata::{
        coderef::CodeReference,
        comparer::StructuralComparer,
        corlib,
        handle::{Handle, TypeHandle},
        module::{Module, ModuleId, ModuleRc},
        typesystem::{Member, TypeRc},
    },
    Error, Result,
};

/// Number of lookups between two opportunistic sweeps
const SWEEP_INTERVAL: usize = 256;

/// Supplies modules for assemblies that are referenced but not registered.
///
/// [`crate::metadata::universe::MetadataUniverse`] implements this for its resolution set.
pub trait AssemblyResolver: Send + Sync {
    /// Loads the module of `assembly`, if this resolver knows it.
    fn resolve_assembly(&self, assembly: &str) -> Option<ModuleRc>;
}

/// Returns true if `handle` refers to a type of `assembly` that was not resident when bound
fn names_assembly(handle: &TypeHandle, assembly: &str) -> bool {
    match handle {
        TypeHandle::Named { assembly: named, .. } => named.eq_ignore_ascii_case(assembly),
        TypeHandle::Instance {
            definition,
            arguments,
        } => {
            names_assembly(definition, assembly)
                || arguments
                    .iter()
                    .any(|argument| names_assembly(argument, assembly))
        }
        TypeHandle::Array { element, .. }
        | TypeHandle::Pointer(element)
        | TypeHandle::ByRef(element) => names_assembly(element, assembly),
        _ => false,
    }
}

struct ModuleBucket {
    liveness: Weak<Module>,
    entries: DashMap<Handle, Member>,
}

pub(crate) struct ProviderInner {
    modules: SkipMap<ModuleId, Weak<Module>>,
    buckets: DashMap<ModuleId, Arc<ModuleBucket>>,
    /// Entries without a home module: types of assemblies that are not resident
    unbound: DashMap<Handle, Member>,
    resolvers: RwLock<Vec<Weak<dyn AssemblyResolver>>>,
    lookups: AtomicUsize,
}

impl ProviderInner {
    /// The resident module `id`
    pub(crate) fn module(&self, id: ModuleId) -> Result<ModuleRc> {
        self.modules
            .get(&id)
            .and_then(|entry| entry.value().upgrade())
            .ok_or(Error::Unloaded)
    }

    /// Live registered modules in registration order, the core library last
    pub(crate) fn search_order(&self) -> Vec<ModuleRc> {
        let core = corlib::core_library().ok();
        let core_id = core.as_ref().map(|core| core.id());

        let mut modules: Vec<ModuleRc> = self
            .modules
            .iter()
            .filter(|entry| Some(*entry.key()) != core_id)
            .filter_map(|entry| entry.value().upgrade())
            .collect();
        modules.extend(core);
        modules
    }

    pub(crate) fn register(&self, module: &ModuleRc) {
        if self.modules.get(&module.id()).is_none() {
            self.modules.insert(module.id(), Arc::downgrade(module));
            let evicted = self.evict_unbound(module.assembly_name());
            tracing::debug!(
                id = %module.id(),
                assembly = module.assembly_name(),
                evicted,
                "registered module"
            );
        }
        self.sweep();
    }

    /// Drops placeholders of `assembly`; its references bind to definitions from now on
    fn evict_unbound(&self, assembly: &str) -> usize {
        let before = self.unbound.len();
        self.unbound.retain(|handle, _| match handle {
            Handle::Type(handle) => !names_assembly(handle, assembly),
            _ => true,
        });
        before - self.unbound.len()
    }

    pub(crate) fn resolvers(&self) -> Vec<Arc<dyn AssemblyResolver>> {
        read_lock!(self.resolvers)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Materializes or fetches the object for `handle`
    pub(crate) fn member(self: &Arc<Self>, handle: &Handle) -> Result<Member> {
        if self.lookups.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }

        let handle = self.canonical(handle);
        match handle.home() {
            Some(id) => {
                let bucket = self.bucket(id)?;
                Self::lookup_or_insert(self, &bucket.entries, handle)
            }
            None => Self::lookup_or_insert(self, &self.unbound, handle),
        }
    }

    fn lookup_or_insert(
        provider: &Arc<Self>,
        entries: &DashMap<Handle, Member>,
        handle: Handle,
    ) -> Result<Member> {
        let cached = entries.get(&handle).map(|entry| entry.value().clone());
        if let Some(member) = cached {
            return Ok(member);
        }

        let member = Member::materialize(provider, &handle)?;
        tracing::trace!(?handle, "materialized");
        Ok(entries.entry(handle).or_insert(member).value().clone())
    }

    pub(crate) fn get_type(self: &Arc<Self>, handle: &TypeHandle) -> Result<TypeRc> {
        match self.member(&Handle::Type(handle.clone()))? {
            Member::Type(ty) | Member::TypeParameter(ty) => Ok(ty),
            other => Err(malformed_error!(
                "Type handle materialized as {}",
                other.kind_name()
            )),
        }
    }

    fn bucket(&self, id: ModuleId) -> Result<Arc<ModuleBucket>> {
        let module = self.module(id)?;
        if let Some(bucket) = self.buckets.get(&id) {
            return Ok(bucket.value().clone());
        }
        Ok(self
            .buckets
            .entry(id)
            .or_insert_with(|| {
                Arc::new(ModuleBucket {
                    liveness: Arc::downgrade(&module),
                    entries: DashMap::new(),
                })
            })
            .value()
            .clone())
    }

    fn sweep(&self) -> usize {
        let dead: Vec<ModuleId> = self
            .buckets
            .iter()
            .filter(|bucket| bucket.value().liveness.strong_count() == 0)
            .map(|bucket| *bucket.key())
            .collect();
        for id in &dead {
            self.buckets.remove(id);
        }

        for entry in &self.modules {
            if entry.value().strong_count() == 0 {
                entry.remove();
            }
        }

        let pruned = {
            let mut resolvers = write_lock!(self.resolvers);
            let before = resolvers.len();
            resolvers.retain(|resolver| resolver.strong_count() > 0);
            before - resolvers.len()
        };

        if !dead.is_empty() || pruned > 0 {
            tracing::debug!(
                count = dead.len(),
                resolvers = pruned,
                "evicted buckets of unloaded modules"
            );
        }
        dead.len()
    }
}

/// Maps raw handles to their metadata objects.
///
/// A provider knows the modules registered with it plus the core library. Lookups by name search
/// the registered modules in registration order, then the core library.
///
/// # Examples
///
/// ```rust,no_run
/// use dotdoc::prelude::*;
///
/// let mut builder = ModuleBuilder::new("Sample");
/// TypeBuilder::class("N", "C").build(&mut builder)?;
/// let module = builder.build()?;
///
/// let provider = MetadataProvider::new();
/// provider.register_module(&module);
/// let class = provider.find_type_by_full_name("N.C").unwrap();
/// assert_eq!(class.base_type().unwrap().full_name(), "System.Object");
/// # Ok::<(), dotdoc::Error>(())
/// ```
#[derive(Clone)]
pub struct MetadataProvider {
    inner: Arc<ProviderInner>,
}

impl MetadataProvider {
    /// The process-wide provider
    pub fn global() -> &'static MetadataProvider {
        static GLOBAL: OnceLock<MetadataProvider> = OnceLock::new();
        GLOBAL.get_or_init(MetadataProvider::new)
    }

    /// Creates an independent provider that only knows the core library.
    #[must_use]
    pub fn new() -> Self {
        let inner = Arc::new(ProviderInner {
            modules: SkipMap::new(),
            buckets: DashMap::new(),
            unbound: DashMap::new(),
            resolvers: RwLock::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        });
        match corlib::core_library() {
            Ok(core) => inner.register(&core),
            Err(error) => tracing::warn!(%error, "core library unavailable"),
        }
        MetadataProvider { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ProviderInner>) -> Self {
        MetadataProvider { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ProviderInner> {
        &self.inner
    }

    /// Makes the types of `module` reachable through this provider.
    ///
    /// The provider holds the module weakly; it stays registered as long as the caller keeps it
    /// alive. Registering a module twice has no effect.
    pub fn register_module(&self, module: &ModuleRc) {
        self.inner.register(module);
    }

    /// Live registered modules in registration order, the core library last
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleRc> {
        self.inner.search_order()
    }

    /// Returns a registered module by its assembly name (case-insensitive)
    #[must_use]
    pub fn module_by_assembly(&self, assembly: &str) -> Option<ModuleRc> {
        self.modules()
            .into_iter()
            .find(|module| module.assembly_name().eq_ignore_ascii_case(assembly))
    }

    /// Adds a resolver consulted for references into assemblies that are not registered.
    ///
    /// Resolvers are held weakly and skipped once dropped.
    pub fn add_resolver(&self, resolver: Weak<dyn AssemblyResolver>) {
        write_lock!(self.inner.resolvers).push(resolver);
    }

    /// Stops consulting `resolver`
    pub fn remove_resolver(&self, resolver: &Weak<dyn AssemblyResolver>) {
        write_lock!(self.inner.resolvers).retain(|known| !Weak::ptr_eq(known, resolver));
    }

    /// The type object of `handle`.
    ///
    /// # Errors
    /// Returns [`Error::Unloaded`] if the module of the handle is not registered or no longer
    /// resident, and [`Error::UnsupportedMember`] for function pointers and typed references.
    pub fn get_type(&self, handle: &TypeHandle) -> Result<TypeRc> {
        self.inner.get_type(handle)
    }

    /// The metadata object of `handle`.
    ///
    /// # Errors
    /// See [`MetadataProvider::get_type`]; also returns [`Error::TokenNotFound`] for rows that do
    /// not exist.
    pub fn get_member(&self, handle: &Handle) -> Result<Member> {
        self.inner.member(handle)
    }

    /// The type object of the TypeDef `row` of `module`, registering the module if needed.
    ///
    /// # Errors
    /// See [`MetadataProvider::get_type`].
    pub fn type_definition(&self, module: &ModuleRc, row: u32) -> Result<TypeRc> {
        self.register_module(module);
        self.get_type(&TypeHandle::definition(module.id(), row))
    }

    /// Finds a type by its full name (`Namespace.Outer+Inner`, generic arity included).
    ///
    /// Registered modules are searched first, then the core library. Returns `None` if no
    /// module defines the type.
    #[must_use]
    pub fn find_type_by_full_name(&self, full_name: &str) -> Option<TypeRc> {
        if full_name.is_empty() {
            return None;
        }
        self.inner.search_order().iter().find_map(|module| {
            let row = module.find_type_by_full_name(full_name)?;
            self.get_type(&TypeHandle::definition(module.id(), row)).ok()
        })
    }

    /// Every type definition, nested types included, of every live registered module and the
    /// core library
    #[must_use]
    pub fn known_types(&self) -> Vec<TypeRc> {
        let mut types = Vec::new();
        for module in self.inner.search_order() {
            for row in 1..=module.type_count() {
                match self.get_type(&TypeHandle::definition(module.id(), row)) {
                    Ok(ty) => types.push(ty),
                    Err(error) => {
                        tracing::warn!(%error, module = %module.id(), row, "skipping type");
                    }
                }
            }
        }
        types
    }

    /// Known types that declare extension methods, in [`MetadataProvider::known_types`] order
    #[must_use]
    pub fn extension_types(&self) -> Vec<TypeRc> {
        self.known_types()
            .into_iter()
            .filter(|ty| ty.is_extension_container())
            .collect()
    }

    /// Resolves a code reference (`M:N.C.#ctor(System.Int32)`) to its member.
    ///
    /// Returns `None` for malformed references and references that do not bind.
    #[must_use]
    pub fn resolve_member(&self, reference: &str) -> Option<Member> {
        CodeReference::parse(reference)?.resolve(self)
    }

    /// The structural comparer over this provider's modules
    #[must_use]
    pub fn comparer(&self) -> StructuralComparer<'_> {
        StructuralComparer::new(&self.inner)
    }

    /// Drops every cached metadata object. Registered modules stay registered.
    pub fn clear_cache(&self) {
        self.inner.buckets.clear();
        self.inner.unbound.clear();
        tracing::debug!("cleared metadata cache");
    }

    /// Unregisters every module except the core library and clears the cache.
    pub fn reset(&self) {
        let core = corlib::core_library().ok().map(|core| core.id());
        for entry in &self.inner.modules {
            if Some(*entry.key()) != core {
                entry.remove();
            }
        }
        self.clear_cache();
    }

    /// Removes the cache buckets of modules that are no longer resident and returns how many
    /// were removed. Resolvers that were dropped are forgotten as well.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Number of cached metadata objects
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.inner
            .buckets
            .iter()
            .map(|bucket| bucket.value().entries.len())
            .sum::<usize>()
            + self.inner.unbound.len()
    }
}

impl Default for MetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetadataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataProvider")
            .field("modules", &self.inner.modules.len())
            .field("buckets", &self.inner.buckets.len())
            .finish_non_exhaustive()
    }
}

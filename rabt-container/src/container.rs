//! # The Container: heart of rabt
//!
//! Owns the registration table, the type registry and one instance store
//! per registered type. Resolution walks a type's dependency descriptor
//! depth-first, building or reusing each dependency; destruction walks the
//! recorded dependencies of an instance and releases the transient ones
//! with it.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──wrap──> SharedContainer
//!                                   │
//!                   resolve::<T>()  │  destroy(&handle)
//!                                   ▼
//!          RegistrationTable ─> Dependencies ─> InstanceStore
//! ```
//!
//! A `Container` is single-owner: everything that mutates takes
//! `&mut self`. Use [`SharedContainer`](crate::sync::SharedContainer) to
//! share one between threads.
//!
//! # Examples
//! ```rust
//! use rabt_container::prelude::*;
//!
//! #[derive(Default)]
//! struct Config;
//!
//! struct Repository {
//!     config: Handle<Config>,
//! }
//!
//! let mut container = Container::builder()
//!     .singleton_default::<Config>()
//!     .transient_with::<Repository>(vec![TypeKey::of::<Config>()], |deps| {
//!         Ok(Repository { config: deps.next()? })
//!     })
//!     .build()
//!     .expect("Failed to build container");
//!
//! let first = container.resolve::<Repository>().unwrap();
//! let second = container.resolve::<Repository>().unwrap();
//! assert_ne!(first, second);
//! assert_eq!(first.config, second.config);
//!
//! container.destroy(&first).unwrap();
//! assert_eq!(container.instance_count::<Repository>(), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rabt_support::rendering::{TreeEntry, render_tree};
use tracing::{debug, trace, warn};

use crate::config::ContainerConfig;
use crate::descriptor::{Dependencies, Injectable};
use crate::error::{
    AlreadyRegisteredError, CircularDependencyError, RabtError, Result, UnknownInstanceError,
};
use crate::graph::GraphValidator;
use crate::handle::{Handle, Instance, InstanceId, ObjectHandle};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::provider::Provider;
use crate::registry::{Registration, RegistrationTable};
use crate::store::{InstanceRecord, InstanceStore};
use crate::type_registry::TypeRegistry;

// ============================================================
// ContainerBuilder
// ============================================================

type Step = Box<dyn FnOnce(&mut Container) -> Result<()>>;

/// Builds a [`Container`] from a list of registrations.
///
/// Registrations are applied in order when [`build`](Self::build) runs,
/// after which the dependency graph is validated.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .allow_override(false)
///     .singleton::<Config>()
///     .transient::<Mailer>()
///     .build()?;
/// ```
pub struct ContainerBuilder {
    config: ContainerConfig,
    steps: Vec<Step>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow re-registering a type (default: true).
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.config.allow_override = allow;
        self
    }

    /// Fail fast on circular dependencies (default: true).
    pub fn detect_cycles(mut self, detect: bool) -> Self {
        self.config.detect_cycles = detect;
        self
    }

    /// Deepest allowed resolution nesting (default: 256).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    // ── Injectable types ──

    /// Register `T` with a new instance per resolve.
    pub fn transient<T: Injectable>(self) -> Self {
        self.step(|c| c.register_transient::<T>())
    }

    /// Register `T` as a shared singleton.
    pub fn singleton<T: Injectable>(self) -> Self {
        self.step(|c| c.register_singleton::<T>())
    }

    // ── Interface bindings ──

    /// Register interface `I` implemented by `Impl` as transient.
    pub fn transient_as<I: Send + Sync + 'static, Impl: Injectable>(
        self,
        upcast: impl Fn(Impl) -> I + Send + Sync + 'static,
    ) -> Self {
        self.step(move |c| c.register_transient_as::<I, Impl>(upcast))
    }

    /// Register interface `I` implemented by `Impl` as a singleton.
    pub fn singleton_as<I: Send + Sync + 'static, Impl: Injectable>(
        self,
        upcast: impl Fn(Impl) -> I + Send + Sync + 'static,
    ) -> Self {
        self.step(move |c| c.register_singleton_as::<I, Impl>(upcast))
    }

    // ── Explicit descriptor + factory ──

    /// Register `T` built by `factory` from `dependencies` as transient.
    pub fn transient_with<T: Send + Sync + 'static>(
        self,
        dependencies: Vec<TypeKey>,
        factory: impl Fn(&mut Dependencies) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.step(move |c| c.register_transient_with(dependencies, factory))
    }

    /// Register `T` built by `factory` from `dependencies` as a singleton.
    pub fn singleton_with<T: Send + Sync + 'static>(
        self,
        dependencies: Vec<TypeKey>,
        factory: impl Fn(&mut Dependencies) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.step(move |c| c.register_singleton_with(dependencies, factory))
    }

    // ── Default constructible ──

    /// Register `T` built with `Default` as transient.
    pub fn transient_default<T: Default + Send + Sync + 'static>(self) -> Self {
        self.step(|c| c.register_transient_default::<T>())
    }

    /// Register `T` built with `Default` as a singleton.
    pub fn singleton_default<T: Default + Send + Sync + 'static>(self) -> Self {
        self.step(|c| c.register_singleton_default::<T>())
    }

    /// Register a pre-built value as a singleton.
    pub fn instance<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.step(move |c| c.register_instance(value))
    }

    /// Add a [`Provider`] module.
    pub fn provider(self, provider: impl Provider + 'static) -> Self {
        self.step(move |c| c.add_provider(&provider))
    }

    /// Build the container: apply registrations, then validate the graph.
    ///
    /// # Errors
    /// The first registration error, or the first graph problem found by
    /// [`Container::validate`].
    pub fn build(self) -> Result<Container> {
        let mut container = Container::with_config(self.config);
        for step in self.steps {
            step(&mut container)?;
        }

        container.validate()?;
        debug!(registered = container.registrations.len(), "Container built");
        Ok(container)
    }

    fn step(mut self, step: impl FnOnce(&mut Container) -> Result<()> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Dependency injection container.
///
/// Created with [`Container::new`], [`Container::with_config`] or
/// [`Container::builder`]. Dropping the container releases every instance
/// it still owns; handles held elsewhere keep their values alive.
pub struct Container {
    config: ContainerConfig,
    types: TypeRegistry,
    registrations: RegistrationTable,
    stores: HashMap<TypeKey, InstanceStore>,
    /// Keys currently being built, outermost first.
    resolving: Vec<TypeKey>,
    next_instance: u64,
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            config,
            types: TypeRegistry::new(),
            registrations: RegistrationTable::new(),
            stores: HashMap::new(),
            resolving: Vec::new(),
            next_instance: 1,
        }
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Every type this container has seen, registered or named as a
    /// dependency.
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn registrations(&self) -> &RegistrationTable {
        &self.registrations
    }

    // ── Registration ──

    /// Installs a registration.
    ///
    /// Replacing an existing registration is allowed unless
    /// `allow_override` is off. A replaced singleton's cached instance is
    /// released without running its release hook; handles to it stay
    /// valid but the container no longer owns it, and the next resolve
    /// builds a fresh one. Pooled transients survive a replacement that
    /// keeps the transient lifetime.
    ///
    /// # Errors
    /// [`RabtError::AlreadyRegistered`] when overriding is disabled.
    pub fn register(&mut self, registration: Registration) -> Result<()> {
        let key = registration.key;
        let lifetime = registration.lifetime;

        if !self.config.allow_override && self.registrations.is_registered(&key) {
            return Err(RabtError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        self.types.record(key);
        for dep in &registration.dependencies {
            self.types.record(*dep);
        }

        let replaced = self.registrations.bind(registration);

        match self.stores.get_mut(&key) {
            Some(store)
                if replaced.is_some()
                    && lifetime == Lifetime::Transient
                    && store.lifetime() == Lifetime::Transient => {}
            Some(store) => {
                let orphaned = store.clear().len();
                if orphaned > 0 {
                    warn!(
                        key = %key,
                        orphaned,
                        "Registration replaced; existing instances are no longer owned by the container"
                    );
                }
                *store = InstanceStore::for_lifetime(lifetime);
            }
            None => {
                self.stores.insert(key, InstanceStore::for_lifetime(lifetime));
            }
        }

        Ok(())
    }

    /// Register `T` with a new instance per resolution.
    pub fn register_transient<T: Injectable>(&mut self) -> Result<()> {
        self.register(Registration::injectable::<T>(Lifetime::Transient))
    }

    /// Register `T` with one shared instance.
    pub fn register_singleton<T: Injectable>(&mut self) -> Result<()> {
        self.register(Registration::injectable::<T>(Lifetime::Singleton))
    }

    /// Register interface `I` (usually `Arc<dyn Trait>`), built from
    /// `Impl` and converted by `upcast`, with a new instance per resolution.
    pub fn register_transient_as<I: Send + Sync + 'static, Impl: Injectable>(
        &mut self,
        upcast: impl Fn(Impl) -> I + Send + Sync + 'static,
    ) -> Result<()> {
        self.register(Registration::bound::<I, Impl>(Lifetime::Transient, upcast))
    }

    /// Register interface `I` implemented by `Impl` with one shared instance.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use rabt_container::prelude::*;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct FixedClock;
    ///
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> u64 {
    ///         42
    ///     }
    /// }
    ///
    /// impl Injectable for FixedClock {
    ///     fn dependencies() -> Vec<TypeKey> {
    ///         vec![]
    ///     }
    ///
    ///     fn construct(_: &mut Dependencies) -> Result<Self> {
    ///         Ok(FixedClock)
    ///     }
    /// }
    ///
    /// let mut container = Container::new();
    /// container
    ///     .register_singleton_as::<Arc<dyn Clock>, FixedClock>(|clock| Arc::new(clock) as Arc<dyn Clock>)
    ///     .unwrap();
    ///
    /// let clock = container.resolve::<Arc<dyn Clock>>().unwrap();
    /// assert_eq!(clock.now(), 42);
    /// ```
    pub fn register_singleton_as<I: Send + Sync + 'static, Impl: Injectable>(
        &mut self,
        upcast: impl Fn(Impl) -> I + Send + Sync + 'static,
    ) -> Result<()> {
        self.register(Registration::bound::<I, Impl>(Lifetime::Singleton, upcast))
    }

    pub fn register_transient_with<T: Send + Sync + 'static>(
        &mut self,
        dependencies: Vec<TypeKey>,
        factory: impl Fn(&mut Dependencies) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.register(Registration::with_factory(Lifetime::Transient, dependencies, factory))
    }

    pub fn register_singleton_with<T: Send + Sync + 'static>(
        &mut self,
        dependencies: Vec<TypeKey>,
        factory: impl Fn(&mut Dependencies) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.register(Registration::with_factory(Lifetime::Singleton, dependencies, factory))
    }

    pub fn register_transient_default<T: Default + Send + Sync + 'static>(&mut self) -> Result<()> {
        self.register(Registration::default_constructed::<T>(Lifetime::Transient))
    }

    pub fn register_singleton_default<T: Default + Send + Sync + 'static>(&mut self) -> Result<()> {
        self.register(Registration::default_constructed::<T>(Lifetime::Singleton))
    }

    /// Register a pre-built value as a singleton.
    ///
    /// The cell is populated right away. If the instance is destroyed, the
    /// next resolve stores the same value again under a new identity.
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, value: T) -> Result<()> {
        let shared: Instance = Arc::new(value);
        let key = TypeKey::of::<T>();

        self.register(Registration {
            key,
            lifetime: Lifetime::Singleton,
            dependencies: vec![],
            allocate: Arc::new(move |_: &mut Dependencies| -> Result<Instance> { Ok(Arc::clone(&shared)) }),
            release: None,
        })?;

        self.resolve_key(&key).map(|_| ())
    }

    /// Attach a hook that runs whenever the container releases a `T`.
    ///
    /// # Errors
    /// [`RabtError::NotRegistered`] if `T` has no registration.
    pub fn on_release<T: Send + Sync + 'static>(
        &mut self,
        hook: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<()> {
        let key = TypeKey::of::<T>();
        self.registrations.lookup(&key)?;

        if let Some(registration) = self.registrations.get_mut(&key) {
            let updated = registration.clone().on_release::<T>(hook);
            *registration = updated;
        }
        Ok(())
    }

    /// Let a [`Provider`] register its types.
    pub fn add_provider(&mut self, provider: &dyn Provider) -> Result<()> {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(self)
    }

    // ── Queries ──

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.registrations.is_registered(&TypeKey::of::<T>())
    }

    /// `false` when unregistered.
    pub fn is_transient<T: ?Sized + 'static>(&self) -> bool {
        self.lifetime_of::<T>() == Some(Lifetime::Transient)
    }

    /// `false` when unregistered.
    pub fn is_singleton<T: ?Sized + 'static>(&self) -> bool {
        self.lifetime_of::<T>() == Some(Lifetime::Singleton)
    }

    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.registrations.lifetime_of(&TypeKey::of::<T>())
    }

    /// Number of instances of `T` the container currently owns.
    pub fn instance_count<T: ?Sized + 'static>(&self) -> usize {
        self.instance_count_key(&TypeKey::of::<T>())
    }

    pub fn instance_count_key(&self, key: &TypeKey) -> usize {
        self.stores.get(key).map_or(0, InstanceStore::len)
    }

    /// Checks every registration: all dependencies registered, no cycles.
    pub fn validate(&self) -> Result<()> {
        GraphValidator::new(&self.registrations).validate()
    }

    /// Renders the dependency tree of `T` with lifetimes.
    ///
    /// ```text
    /// [Transient] Service
    ///   [Singleton] Config
    ///   [Transient] Repository
    ///     [Singleton] Config
    /// ```
    pub fn describe<T: ?Sized + 'static>(&self) -> String {
        let mut entries = Vec::new();
        let mut path = HashSet::new();
        self.describe_into(TypeKey::of::<T>(), 0, &mut path, &mut entries);
        render_tree(&entries)
    }

    fn describe_into(
        &self,
        key: TypeKey,
        depth: usize,
        path: &mut HashSet<TypeKey>,
        entries: &mut Vec<TreeEntry>,
    ) {
        let registration = self.registrations.get(&key);
        let revisits = !path.insert(key);

        entries.push(TreeEntry {
            depth,
            type_name: if revisits {
                format!("{} (cycle)", key.short_name())
            } else {
                key.short_name()
            },
            lifetime: registration.map(|r| r.lifetime.to_string()),
        });

        if revisits {
            return;
        }
        if let Some(registration) = registration {
            for dep in &registration.dependencies {
                self.describe_into(*dep, depth + 1, path, entries);
            }
        }
        path.remove(&key);
    }

    // ── Resolution ──

    /// Resolve `T`, building its dependencies first.
    ///
    /// ```rust,ignore
    /// let mailer: Handle<Mailer> = container.resolve()?;
    /// ```
    ///
    /// # Errors
    /// - [`RabtError::NotRegistered`]: `T` or one of its dependencies
    /// - [`RabtError::CircularDependency`]: `T` depends on itself
    /// - [`RabtError::DepthExceeded`]: nesting beyond `max_depth`
    /// - whatever a factory returns
    ///
    /// Transient instances built before a failure are destroyed again.
    pub fn resolve<T: Send + Sync + 'static>(&mut self) -> Result<Handle<T>> {
        self.resolve_key(&TypeKey::of::<T>())?.downcast()
    }

    /// Resolve by key, returning an untyped handle.
    pub fn resolve_key(&mut self, key: &TypeKey) -> Result<ObjectHandle> {
        trace!(key = %key, "Resolving");
        self.resolve_inner(*key)
    }

    fn resolve_inner(&mut self, key: TypeKey) -> Result<ObjectHandle> {
        let registration = self
            .registrations
            .lookup_for(&key, self.resolving.last().copied())?
            .clone();

        self.enter(key)?;
        let built = self.construct(&registration);
        self.resolving.pop();
        built
    }

    /// Pushes `key` on the in-progress stack.
    fn enter(&mut self, key: TypeKey) -> Result<()> {
        if self.config.detect_cycles {
            if let Some(start) = self.resolving.iter().position(|k| *k == key) {
                let mut chain = self.resolving[start..].to_vec();
                chain.push(key);
                warn!(cycle = ?chain, "Circular dependency detected");
                return Err(RabtError::CircularDependency(CircularDependencyError { chain }));
            }
        }

        if self.resolving.len() >= self.config.max_depth {
            return Err(RabtError::DepthExceeded {
                key,
                max_depth: self.config.max_depth,
            });
        }

        self.resolving.push(key);
        Ok(())
    }

    fn construct(&mut self, registration: &Registration) -> Result<ObjectHandle> {
        let mut resolved = Vec::with_capacity(registration.dependencies.len());
        for dep in &registration.dependencies {
            match self.resolve_inner(*dep) {
                Ok(handle) => resolved.push(handle),
                Err(err) => {
                    self.roll_back(&resolved);
                    return Err(err);
                }
            }
        }

        // an occupied singleton cell discards the freshly resolved arguments
        if let Some(cached) = self
            .stores
            .get(&registration.key)
            .and_then(InstanceStore::cached)
        {
            trace!(
                key = %registration.key,
                instance = %cached.id(),
                discarded = resolved.len(),
                "Reusing singleton"
            );
            self.roll_back(&resolved);
            return Ok(cached);
        }

        let mut args = Dependencies::new(registration.key, resolved);
        let value = match (registration.allocate)(&mut args) {
            Ok(value) => value,
            Err(err) => {
                self.roll_back(args.handles());
                return Err(err);
            }
        };

        let id = self.next_instance_id();
        let record = InstanceRecord {
            handle: ObjectHandle::new(id, registration.key, value),
            dependencies: args.into_handles(),
        };

        let handle = self
            .stores
            .entry(registration.key)
            .or_insert_with(|| InstanceStore::for_lifetime(registration.lifetime))
            .insert(record);

        debug!(
            key = %registration.key,
            instance = %handle.id(),
            lifetime = %registration.lifetime,
            "Constructed instance"
        );
        Ok(handle)
    }

    /// Destroys transient arguments built for a construction that failed or
    /// was discarded.
    fn roll_back(&mut self, built: &[ObjectHandle]) {
        for handle in built.iter().rev() {
            if !self.cascades_into(&handle.key()) {
                continue;
            }
            if let Err(err) = self.destroy_key(&handle.key(), handle) {
                warn!(key = %handle.key(), error = %err, "Rollback could not destroy instance");
            }
        }
    }

    fn next_instance_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        id
    }

    // ── Destruction ──

    /// Release an instance of `T` and, recursively, its transient
    /// dependencies. Singleton dependencies are left alone.
    ///
    /// Destroying a singleton whose cell is already empty is a no-op.
    ///
    /// # Errors
    /// - [`RabtError::NotRegistered`]: `T` has no registration
    /// - [`RabtError::UnknownInstance`]: the handle is not owned by `T`'s
    ///   store (already destroyed, another type's, another container's).
    ///   Nothing is released in that case.
    pub fn destroy<T: Send + Sync + 'static>(&mut self, handle: &Handle<T>) -> Result<()> {
        self.destroy_key(&TypeKey::of::<T>(), &handle.erase())
    }

    /// Untyped [`destroy`](Self::destroy).
    pub fn destroy_key(&mut self, key: &TypeKey, handle: &ObjectHandle) -> Result<()> {
        self.registrations.lookup(key)?;

        // validate the whole cascade before touching any store
        let mut doomed = Vec::new();
        self.plan_destroy(*key, handle, &mut doomed)?;

        for (key, doomed_handle) in doomed {
            let record = self
                .stores
                .get_mut(&key)
                .and_then(|store| store.remove(&doomed_handle));
            if let Some(record) = record {
                self.release(key, record);
            }
        }
        Ok(())
    }

    /// Collects `(key, handle)` pairs in destruction order, dependencies first.
    fn plan_destroy(
        &self,
        key: TypeKey,
        handle: &ObjectHandle,
        doomed: &mut Vec<(TypeKey, ObjectHandle)>,
    ) -> Result<()> {
        let store = self.stores.get(&key).ok_or_else(|| unknown_instance(key, handle))?;

        let record = match store.find(key, handle)? {
            Some(record) => record,
            None => {
                trace!(key = %key, "Singleton cell already empty");
                return Ok(());
            }
        };

        for dep in &record.dependencies {
            if !self.cascades_into(&dep.key()) {
                continue;
            }
            // destroyed directly, or orphaned by a re-registration
            if !self.owns(dep) {
                trace!(key = %dep.key(), instance = %dep.id(), "Dependency already released");
                continue;
            }
            self.plan_destroy(dep.key(), dep, doomed)?;
        }

        if !doomed.iter().any(|(k, h)| *k == key && h.same_instance(handle)) {
            doomed.push((key, handle.clone()));
        }
        Ok(())
    }

    /// Whether destroying a consumer also destroys a dependency of type `key`.
    fn cascades_into(&self, key: &TypeKey) -> bool {
        self.registrations
            .lifetime_of(key)
            .is_some_and(|lifetime| lifetime.cascades())
    }

    fn owns(&self, handle: &ObjectHandle) -> bool {
        self.stores
            .get(&handle.key())
            .is_some_and(|store| matches!(store.find(handle.key(), handle), Ok(Some(_))))
    }

    fn release(&self, key: TypeKey, record: InstanceRecord) {
        if let Some(hook) = self.registrations.get(&key).and_then(|r| r.release.as_ref()) {
            hook(&record.handle);
        }
        debug!(key = %key, instance = %record.handle.id(), "Destroyed instance");
    }

    /// Releases every owned instance. Registrations are kept.
    pub fn clear_instances(&mut self) {
        let mut released = Vec::new();
        for (key, store) in &mut self.stores {
            released.extend(store.clear().into_iter().map(|record| (*key, record)));
        }

        let count = released.len();
        for (key, record) in released {
            self.release(key, record);
        }
        if count > 0 {
            debug!(released = count, "Cleared container instances");
        }
    }
}

fn unknown_instance(key: TypeKey, handle: &ObjectHandle) -> RabtError {
    RabtError::UnknownInstance(UnknownInstanceError {
        key,
        instance: handle.id(),
        produced_for: (handle.key() != key).then(|| handle.key()),
    })
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.clear_instances();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live: usize = self.stores.values().map(InstanceStore::len).sum();
        f.debug_struct("Container")
            .field("registered", &self.registrations.len())
            .field("instances", &live)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::config::ContainerConfig;
    pub use crate::descriptor::{Dependencies, Injectable};
    pub use crate::error::{RabtError, Result};
    pub use crate::handle::{Handle, InstanceId, ObjectHandle};
    pub use crate::key::TypeKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::Provider;
    pub use crate::registry::Registration;
    pub use crate::sync::SharedContainer;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Config;

    struct Repository {
        config: Handle<Config>,
    }

    impl Injectable for Repository {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Config>()]
        }

        fn construct(deps: &mut Dependencies) -> Result<Self> {
            Ok(Repository { config: deps.next()? })
        }
    }

    #[derive(Default)]
    struct Scratch;

    struct Service {
        repository: Handle<Repository>,
        scratch: Handle<Scratch>,
    }

    impl Injectable for Service {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Repository>(), TypeKey::of::<Scratch>()]
        }

        fn construct(deps: &mut Dependencies) -> Result<Self> {
            Ok(Service {
                repository: deps.next()?,
                scratch: deps.next()?,
            })
        }
    }

    fn wired() -> Container {
        let mut container = Container::new();
        container.register_singleton_default::<Config>().unwrap();
        container.register_transient::<Repository>().unwrap();
        container.register_transient_default::<Scratch>().unwrap();
        container.register_transient::<Service>().unwrap();
        container
    }

    #[test]
    fn transient_resolves_are_distinct() {
        let mut container = wired();
        let a = container.resolve::<Scratch>().unwrap();
        let b = container.resolve::<Scratch>().unwrap();

        assert_ne!(a, b);
        assert_eq!(container.instance_count::<Scratch>(), 2);
    }

    #[test]
    fn singleton_resolves_are_identical() {
        let mut container = wired();
        let a = container.resolve::<Config>().unwrap();
        let b = container.resolve::<Config>().unwrap();

        assert_eq!(a, b);
        assert!(Arc::ptr_eq(a.as_arc(), b.as_arc()));
        assert_eq!(container.instance_count::<Config>(), 1);
    }

    #[test]
    fn consumers_share_singleton_but_not_transient() {
        let mut container = wired();
        let first = container.resolve::<Service>().unwrap();
        let second = container.resolve::<Service>().unwrap();

        assert_eq!(first.repository.config, second.repository.config);
        assert_ne!(first.repository, second.repository);
        assert_ne!(first.scratch, second.scratch);
        assert_eq!(container.instance_count::<Repository>(), 2);
        assert_eq!(container.instance_count::<Config>(), 1);
    }

    struct Cache {
        config: Handle<Config>,
        scratch: Handle<Scratch>,
    }

    /// `wired()` plus a singleton `Cache` over transient `Scratch`, whose
    /// factory runs are counted.
    fn with_cache() -> (Container, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let mut container = wired();
        container
            .register_transient_with::<Scratch>(vec![], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Scratch)
            })
            .unwrap();
        container
            .register_singleton_with::<Cache>(
                vec![TypeKey::of::<Config>(), TypeKey::of::<Scratch>()],
                |deps| {
                    Ok(Cache {
                        config: deps.next()?,
                        scratch: deps.next()?,
                    })
                },
            )
            .unwrap();
        (container, built)
    }

    #[test]
    fn cached_singleton_still_resolves_dependencies() {
        let (mut container, built) = with_cache();

        let a = container.resolve::<Cache>().unwrap();
        let b = container.resolve::<Cache>().unwrap();

        // the second resolve builds a Scratch and throws it away
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(a, b);
        assert_eq!(a.scratch, b.scratch);
        assert_eq!(container.instance_count::<Scratch>(), 1);
        assert_eq!(container.instance_count::<Cache>(), 1);
    }

    #[test]
    fn destroying_singleton_cascades_to_its_transients() {
        let (mut container, _) = with_cache();
        let cache = container.resolve::<Cache>().unwrap();
        let config = container.resolve::<Config>().unwrap();
        assert_eq!(container.instance_count::<Scratch>(), 1);

        container.destroy(&cache).unwrap();

        assert_eq!(container.instance_count::<Cache>(), 0);
        assert_eq!(container.instance_count::<Scratch>(), 0);
        assert_eq!(container.instance_count::<Config>(), 1);
        assert_eq!(cache.config, config);
    }

    #[test]
    fn destroy_cascades_to_transients_only() {
        let mut container = wired();
        let service = container.resolve::<Service>().unwrap();
        let config = container.resolve::<Config>().unwrap();

        container.destroy(&service).unwrap();

        assert_eq!(container.instance_count::<Service>(), 0);
        assert_eq!(container.instance_count::<Repository>(), 0);
        assert_eq!(container.instance_count::<Scratch>(), 0);
        assert_eq!(container.instance_count::<Config>(), 1);
        assert_eq!(container.resolve::<Config>().unwrap(), config);
    }

    #[test]
    fn destroy_leaves_unrelated_transients() {
        let mut container = wired();
        let service = container.resolve::<Service>().unwrap();
        let loose = container.resolve::<Scratch>().unwrap();

        container.destroy(&service).unwrap();

        assert_eq!(container.instance_count::<Scratch>(), 1);
        container.destroy(&loose).unwrap();
        assert_eq!(container.instance_count::<Scratch>(), 0);
    }

    #[test]
    fn destroy_skips_dependency_released_earlier() {
        let mut container = wired();
        let service = container.resolve::<Service>().unwrap();
        container.destroy(&service.scratch).unwrap();

        container.destroy(&service).unwrap();
        assert_eq!(container.instance_count::<Repository>(), 0);
        assert_eq!(container.instance_count::<Service>(), 0);
    }

    #[test]
    fn destroy_unregistered_type_fails() {
        let mut container = wired();
        let scratch = container.resolve::<Scratch>().unwrap();
        let mut other = Container::new();

        match other.destroy(&scratch) {
            Err(RabtError::NotRegistered(err)) => {
                assert_eq!(err.requested, TypeKey::of::<Scratch>());
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn double_destroy_fails_without_side_effects() {
        let mut container = wired();
        let service = container.resolve::<Service>().unwrap();
        container.destroy(&service).unwrap();

        let kept = container.resolve::<Scratch>().unwrap();
        assert!(matches!(
            container.destroy(&service),
            Err(RabtError::UnknownInstance(_))
        ));
        assert_eq!(container.instance_count::<Scratch>(), 1);
        container.destroy(&kept).unwrap();
    }

    #[test]
    fn destroy_handle_from_another_container_fails() {
        let mut left = wired();
        let mut right = wired();
        let ours = left.resolve::<Scratch>().unwrap();
        let theirs = right.resolve::<Scratch>().unwrap();
        assert_eq!(ours.id(), theirs.id());

        assert!(matches!(
            left.destroy(&theirs),
            Err(RabtError::UnknownInstance(_))
        ));
        assert_eq!(left.instance_count::<Scratch>(), 1);
    }

    #[test]
    fn destroy_with_handle_of_other_type_fails() {
        let mut container = wired();
        let scratch = container.resolve::<Scratch>().unwrap();

        match container.destroy_key(&TypeKey::of::<Repository>(), &scratch.erase()) {
            Err(RabtError::UnknownInstance(err)) => {
                assert_eq!(err.key, TypeKey::of::<Repository>());
                assert_eq!(err.produced_for, Some(TypeKey::of::<Scratch>()));
            }
            other => panic!("Expected UnknownInstance, got: {other:?}"),
        }
    }

    #[test]
    fn destroying_singleton_twice_is_noop() {
        let mut container = wired();
        let config = container.resolve::<Config>().unwrap();

        container.destroy(&config).unwrap();
        assert_eq!(container.instance_count::<Config>(), 0);
        container.destroy(&config).unwrap();

        let fresh = container.resolve::<Config>().unwrap();
        assert_ne!(fresh, config);
    }

    #[test]
    fn destroying_stale_singleton_handle_fails() {
        let mut container = wired();
        let old = container.resolve::<Config>().unwrap();
        container.destroy(&old).unwrap();
        let _current = container.resolve::<Config>().unwrap();

        assert!(matches!(
            container.destroy(&old),
            Err(RabtError::UnknownInstance(_))
        ));
        assert_eq!(container.instance_count::<Config>(), 1);
    }

    #[test]
    fn resolve_unregistered_names_consumer() {
        let mut container = Container::new();
        container.register_transient::<Repository>().unwrap();

        match container.resolve::<Repository>() {
            Err(RabtError::NotRegistered(err)) => {
                assert_eq!(err.requested, TypeKey::of::<Config>());
                assert_eq!(err.required_by, Some(TypeKey::of::<Repository>()));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
        assert_eq!(container.instance_count::<Repository>(), 0);
    }

    struct Ping;
    struct Pong;

    fn ping_pong(config: ContainerConfig) -> Container {
        let mut container = Container::with_config(config);
        container
            .register_transient_with::<Ping>(vec![TypeKey::of::<Pong>()], |_| Ok(Ping))
            .unwrap();
        container
            .register_transient_with::<Pong>(vec![TypeKey::of::<Ping>()], |_| Ok(Pong))
            .unwrap();
        container
    }

    #[test]
    fn cycle_fails_fast_with_chain() {
        let mut container = ping_pong(ContainerConfig::default());

        match container.resolve::<Ping>() {
            Err(RabtError::CircularDependency(err)) => {
                assert_eq!(
                    err.chain,
                    vec![TypeKey::of::<Ping>(), TypeKey::of::<Pong>(), TypeKey::of::<Ping>()]
                );
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        assert!(container.validate().is_err());
    }

    #[test]
    fn depth_limit_bounds_undetected_cycles() {
        let mut container = ping_pong(ContainerConfig {
            detect_cycles: false,
            max_depth: 16,
            ..ContainerConfig::default()
        });

        match container.resolve::<Ping>() {
            Err(RabtError::DepthExceeded { max_depth, .. }) => assert_eq!(max_depth, 16),
            other => panic!("Expected DepthExceeded, got: {other:?}"),
        }
        // the failed attempt leaves nothing behind
        let retry = container.resolve::<Ping>();
        assert!(matches!(retry, Err(RabtError::DepthExceeded { .. })));
    }

    #[test]
    fn failure_rolls_back_built_transients() {
        struct Broken;
        struct Composite;

        let mut container = wired();
        container
            .register_transient_with::<Broken>(vec![], |_| {
                Err(RabtError::construction(TypeKey::of::<Broken>(), "disk offline"))
            })
            .unwrap();
        container
            .register_transient_with::<Composite>(
                vec![
                    TypeKey::of::<Scratch>(),
                    TypeKey::of::<Config>(),
                    TypeKey::of::<Broken>(),
                ],
                |_| Ok(Composite),
            )
            .unwrap();

        match container.resolve::<Composite>() {
            Err(RabtError::ConstructionFailed { key, source }) => {
                assert_eq!(key, TypeKey::of::<Broken>());
                assert_eq!(source.to_string(), "disk offline");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
        assert_eq!(container.instance_count::<Scratch>(), 0);
        assert_eq!(container.instance_count::<Config>(), 1);
        assert_eq!(container.instance_count::<Composite>(), 0);
    }

    #[test]
    fn factory_error_is_reported_as_construction_failure() {
        let mut container = wired();
        container
            .register_transient_with::<String>(vec![TypeKey::of::<Scratch>()], |_| {
                Err(RabtError::UnknownType("x".into()))
            })
            .unwrap();

        match container.resolve::<String>() {
            Err(RabtError::ConstructionFailed { key, source }) => {
                assert_eq!(key, TypeKey::of::<String>());
                assert_eq!(source.to_string(), "Unknown type: x");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
        assert_eq!(container.instance_count::<Scratch>(), 0);
    }

    #[test]
    fn factory_error_after_dependencies_rolls_back() {
        let mut container = wired();
        container
            .register_transient_with::<String>(vec![TypeKey::of::<Scratch>()], |deps| {
                let _scratch: Handle<Scratch> = deps.next()?;
                deps.next::<u8>().map(|_| String::new())
            })
            .unwrap();

        assert!(matches!(
            container.resolve::<String>(),
            Err(RabtError::MissingArgument { index: 1, declared: 1, .. })
        ));
        assert_eq!(container.instance_count::<Scratch>(), 0);
    }

    #[test]
    fn reregistering_singleton_orphans_cached_instance() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();

        let mut container = wired();
        container
            .on_release::<Config>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let old = container.resolve::<Config>().unwrap();

        container.register_singleton_default::<Config>().unwrap();
        let new = container.resolve::<Config>().unwrap();

        assert_ne!(old, new);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert!(matches!(
            container.destroy(&old),
            Err(RabtError::UnknownInstance(_))
        ));
    }

    #[test]
    fn reregistering_transient_keeps_pool() {
        let mut container = wired();
        let scratch = container.resolve::<Scratch>().unwrap();

        container.register_transient_default::<Scratch>().unwrap();
        assert_eq!(container.instance_count::<Scratch>(), 1);
        container.destroy(&scratch).unwrap();
    }

    #[test]
    fn changing_lifetime_resets_store() {
        let mut container = wired();
        container.resolve::<Scratch>().unwrap();
        container.resolve::<Scratch>().unwrap();

        container.register_singleton_default::<Scratch>().unwrap();
        assert!(container.is_singleton::<Scratch>());
        assert_eq!(container.instance_count::<Scratch>(), 0);

        let a = container.resolve::<Scratch>().unwrap();
        assert_eq!(a, container.resolve::<Scratch>().unwrap());
    }

    #[test]
    fn override_can_be_disabled() {
        let mut container = Container::with_config(ContainerConfig {
            allow_override: false,
            ..ContainerConfig::default()
        });
        container.register_singleton_default::<Config>().unwrap();

        match container.register_transient_default::<Config>() {
            Err(RabtError::AlreadyRegistered(err)) => {
                assert_eq!(err.key, TypeKey::of::<Config>());
            }
            other => panic!("Expected AlreadyRegistered, got: {other:?}"),
        }
        assert!(container.is_singleton::<Config>());
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Polite {
        config: Handle<Config>,
    }

    impl Greeter for Polite {
        fn greet(&self) -> String {
            format!("Good day from {}", self.config.id())
        }
    }

    impl Injectable for Polite {
        fn dependencies() -> Vec<TypeKey> {
            vec![TypeKey::of::<Config>()]
        }

        fn construct(deps: &mut Dependencies) -> Result<Self> {
            Ok(Polite { config: deps.next()? })
        }
    }

    struct Frontdesk {
        greeter: Handle<Arc<dyn Greeter>>,
    }

    #[test]
    fn interface_binding_resolves_trait_object_for_consumer() {
        let mut container = wired();
        container
            .register_transient_as::<Arc<dyn Greeter>, Polite>(|polite| {
                Arc::new(polite) as Arc<dyn Greeter>
            })
            .unwrap();
        container
            .register_transient_with::<Frontdesk>(
                vec![TypeKey::of::<Arc<dyn Greeter>>()],
                |deps| Ok(Frontdesk { greeter: deps.next()? }),
            )
            .unwrap();

        let desk = container.resolve::<Frontdesk>().unwrap();
        let config = container.resolve::<Config>().unwrap();
        assert_eq!(desk.greeter.greet(), format!("Good day from {}", config.id()));
        assert!(container.is_transient::<Arc<dyn Greeter>>());
        assert!(!container.is_registered::<Polite>());

        container.destroy(&desk).unwrap();
        assert_eq!(container.instance_count::<Arc<dyn Greeter>>(), 0);
    }

    #[test]
    fn interface_binding_as_singleton_is_shared() {
        let mut container = Container::builder()
            .singleton_default::<Config>()
            .singleton_as::<Arc<dyn Greeter>, Polite>(|polite| Arc::new(polite) as Arc<dyn Greeter>)
            .build()
            .unwrap();

        let a = container.resolve::<Arc<dyn Greeter>>().unwrap();
        let b = container.resolve::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&*a, &*b));
    }

    #[test]
    fn shared_instance_registered_as_interface() {
        let mut container = wired();
        let config = container.resolve::<Config>().unwrap();
        let greeter: Arc<dyn Greeter> = Arc::new(Polite { config });
        container.register_instance(greeter.clone()).unwrap();

        let resolved = container.resolve::<Arc<dyn Greeter>>().unwrap();
        assert!(Arc::ptr_eq(&*resolved, &greeter));
    }

    #[test]
    fn lifetime_queries() {
        let container = wired();
        assert!(container.is_registered::<Config>());
        assert!(container.is_singleton::<Config>());
        assert!(container.is_transient::<Service>());
        assert_eq!(container.lifetime_of::<Service>(), Some(Lifetime::Transient));

        assert!(!container.is_registered::<u8>());
        assert!(!container.is_transient::<u8>());
        assert!(!container.is_singleton::<u8>());
        assert_eq!(container.lifetime_of::<u8>(), None);
    }

    #[test]
    fn register_instance_hands_out_the_value() {
        let mut container = Container::new();
        container.register_instance(String::from("postgres://localhost")).unwrap();

        assert_eq!(container.instance_count::<String>(), 1);
        let url = container.resolve::<String>().unwrap();
        assert_eq!(*url, "postgres://localhost");

        container.destroy(&url).unwrap();
        let again = container.resolve::<String>().unwrap();
        assert_ne!(again, url);
        assert!(Arc::ptr_eq(again.as_arc(), url.as_arc()));
    }

    #[test]
    fn release_hooks_run_dependencies_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut container = wired();

        let log = order.clone();
        container
            .on_release::<Repository>(move |_| log.lock().unwrap().push("repository"))
            .unwrap();
        let log = order.clone();
        container
            .on_release::<Scratch>(move |_| log.lock().unwrap().push("scratch"))
            .unwrap();
        let log = order.clone();
        container
            .on_release::<Service>(move |_| log.lock().unwrap().push("service"))
            .unwrap();

        let service = container.resolve::<Service>().unwrap();
        container.destroy(&service).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["repository", "scratch", "service"]);
    }

    #[test]
    fn on_release_requires_registration() {
        let mut container = Container::new();
        assert!(matches!(
            container.on_release::<Config>(|_| {}),
            Err(RabtError::NotRegistered(_))
        ));
    }

    #[test]
    fn clear_and_drop_release_everything() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut container = wired();
        let counter = released.clone();
        container
            .on_release::<Scratch>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        container.resolve::<Scratch>().unwrap();
        container.clear_instances();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(container.is_registered::<Scratch>());

        container.resolve::<Scratch>().unwrap();
        container.resolve::<Scratch>().unwrap();
        drop(container);
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn describe_renders_tree() {
        let container = wired();
        let tree = container.describe::<Service>();
        let lines: Vec<&str> = tree.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("[Transient]") && lines[0].ends_with("Service"));
        assert!(lines[1].trim_start().ends_with("Repository"));
        assert!(lines[2].trim_start().starts_with("[Singleton]"));
        assert!(lines[2].ends_with("Config"));
        assert!(lines[3].ends_with("Scratch"));
    }

    #[test]
    fn describe_marks_cycles_and_missing() {
        let container = ping_pong(ContainerConfig::default());
        assert!(container.describe::<Ping>().contains("Ping (cycle)"));
        assert!(container.describe::<u8>().contains("missing"));
    }

    #[test]
    fn builder_validates_graph() {
        let result = Container::builder()
            .transient::<Repository>()
            .build();
        assert!(matches!(result, Err(RabtError::NotRegistered(_))));

        let container = Container::builder()
            .singleton_default::<Config>()
            .transient::<Repository>()
            .instance(7u32)
            .build()
            .unwrap();
        assert_eq!(container.instance_count::<u32>(), 1);
    }

    #[test]
    fn builder_stops_at_first_registration_error() {
        let result = Container::builder()
            .allow_override(false)
            .singleton_default::<Config>()
            .transient_default::<Config>()
            .build();
        assert!(matches!(result, Err(RabtError::AlreadyRegistered(_))));
    }

    #[test]
    fn type_registry_records_dependencies() {
        let container = wired();
        assert!(container.type_registry().contains(&TypeKey::of::<Config>()));
        assert!(container.type_registry().key_for::<Service>().is_ok());
    }

    #[test]
    fn debug_shows_counts() {
        let mut container = wired();
        container.resolve::<Config>().unwrap();
        assert_eq!(
            format!("{container:?}"),
            "Container { registered: 4, instances: 1 }"
        );
    }
}

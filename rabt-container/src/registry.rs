//! Registration table: what the container knows how to build.
//!
//! Maps each [`TypeKey`] to its lifetime, its dependency descriptor and the
//! type-erased functions that build and release its instances.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{Dependencies, Injectable};
use crate::error::{NotRegisteredError, RabtError, Result};
use crate::handle::{Instance, ObjectHandle};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;

/// Builds a type-erased instance from resolved dependencies.
///
/// `Arc` so a registration can be cloned out of the table before it runs;
/// the resolver needs `&mut` access to the container while building.
pub type AllocateFn = Arc<dyn Fn(&mut Dependencies) -> Result<Instance> + Send + Sync>;

/// Runs when the container releases an instance it owned.
pub type ReleaseFn = Arc<dyn Fn(&ObjectHandle) + Send + Sync>;

/// Everything the container needs to build and release one type.
#[derive(Clone)]
pub struct Registration {
    pub key: TypeKey,
    pub lifetime: Lifetime,
    /// Constructor parameters, in declaration order.
    pub dependencies: Vec<TypeKey>,
    pub(crate) allocate: AllocateFn,
    pub(crate) release: Option<ReleaseFn>,
}

impl Registration {
    /// Registration for an [`Injectable`] type.
    pub fn injectable<T: Injectable>(lifetime: Lifetime) -> Self {
        Self::with_factory::<T>(lifetime, T::dependencies(), T::construct)
    }

    /// Registration from an explicit descriptor and factory.
    ///
    /// Factory errors surface as [`RabtError::ConstructionFailed`] for `T`,
    /// except descriptor mistakes (`MissingArgument`, `TypeMismatch`) and
    /// errors that already are `ConstructionFailed`.
    pub fn with_factory<T: Send + Sync + 'static>(
        lifetime: Lifetime,
        dependencies: Vec<TypeKey>,
        factory: impl Fn(&mut Dependencies) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        let key = TypeKey::of::<T>();
        Self {
            key,
            lifetime,
            dependencies,
            allocate: Arc::new(move |deps: &mut Dependencies| -> Result<Instance> {
                match factory(deps) {
                    Ok(value) => Ok(Arc::new(value)),
                    Err(err) => Err(err.into_construction(key)),
                }
            }),
            release: None,
        }
    }

    /// Registration under an interface type `I`, usually `Arc<dyn Trait>`,
    /// built from the [`Injectable`] implementation `Impl`.
    ///
    /// `upcast` turns the built `Impl` into `I`; for a trait object that is
    /// `|imp| Arc::new(imp) as Arc<dyn Trait>`. Consumers depend on
    /// `Handle<I>`.
    pub fn bound<I: Send + Sync + 'static, Impl: Injectable>(
        lifetime: Lifetime,
        upcast: impl Fn(Impl) -> I + Send + Sync + 'static,
    ) -> Self {
        Self::with_factory::<I>(lifetime, Impl::dependencies(), move |deps| {
            Impl::construct(deps).map(&upcast)
        })
    }

    /// Registration for a type with no constructor parameters.
    pub fn default_constructed<T: Default + Send + Sync + 'static>(lifetime: Lifetime) -> Self {
        Self::with_factory::<T>(lifetime, vec![], |_| Ok(T::default()))
    }

    /// Adds a hook that sees every instance this registration releases.
    pub fn on_release<T: Send + Sync + 'static>(
        mut self,
        hook: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        self.release = Some(Arc::new(move |handle: &ObjectHandle| {
            if let Ok(typed) = handle.downcast::<T>() {
                hook(&typed);
            }
        }));
        self
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .field("release_hook", &self.release.is_some())
            .finish()
    }
}

/// Stores one registration per type.
#[derive(Debug, Default)]
pub struct RegistrationTable {
    registrations: HashMap<TypeKey, Registration>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `registration`, returning the one it replaced.
    pub fn bind(&mut self, registration: Registration) -> Option<Registration> {
        debug!(
            key = %registration.key,
            lifetime = %registration.lifetime,
            dependencies = registration.dependencies.len(),
            "Registered type"
        );
        self.registrations.insert(registration.key, registration)
    }

    /// Looks up a registration.
    ///
    /// # Errors
    /// [`RabtError::NotRegistered`], with suggestions, if absent.
    pub fn lookup(&self, key: &TypeKey) -> Result<&Registration> {
        self.lookup_for(key, None)
    }

    /// Like [`lookup`](Self::lookup), naming the consumer in the error.
    pub fn lookup_for(&self, key: &TypeKey, required_by: Option<TypeKey>) -> Result<&Registration> {
        self.registrations.get(key).ok_or_else(|| {
            RabtError::NotRegistered(NotRegisteredError {
                requested: *key,
                required_by,
                suggestions: self.suggestions_for(key),
            })
        })
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Registration> {
        self.registrations.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &TypeKey) -> Option<&mut Registration> {
        self.registrations.get_mut(key)
    }

    pub fn is_registered(&self, key: &TypeKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Lifetime of `key`, `None` when unregistered.
    pub fn lifetime_of(&self, key: &TypeKey) -> Option<Lifetime> {
        self.registrations.get(key).map(|r| r.lifetime)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.registrations.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values()
    }

    fn suggestions_for(&self, key: &TypeKey) -> Vec<String> {
        let names: Vec<&str> = self.registrations.keys().map(TypeKey::type_name).collect();
        rabt_support::rendering::suggest_similar(key.type_name(), &names, 3)
    }
}

//! Handles to container-owned instances.
//!
//! The container stores every instance behind an [`Arc`] and hands out
//! handles that share it. [`ObjectHandle`] is the type-erased form the
//! resolver passes around; [`Handle<T>`] is the typed form clients use.
//! Converting one into the other is a checked downcast.
//!
//! Handles compare by [`InstanceId`], the identity the container assigned
//! when the instance was built, never by value.

use std::any::{Any, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{RabtError, Result};
use crate::key::TypeKey;

/// Type-erased instance as stored by the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identity of one constructed instance, unique within its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    #[inline]
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a live instance.
///
/// Knows which [`TypeKey`] it was produced for, but exposes the value only
/// through [`ObjectHandle::downcast`].
#[derive(Clone)]
pub struct ObjectHandle {
    id: InstanceId,
    key: TypeKey,
    value: Instance,
}

impl ObjectHandle {
    pub(crate) fn new(id: InstanceId, key: TypeKey, value: Instance) -> Self {
        Self { id, key, value }
    }

    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The type this handle was produced for.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// `true` when both handles point at the very same allocation.
    ///
    /// Stricter than `==`, which compares identities only and cannot tell
    /// apart equal ids issued by two different containers.
    pub fn same_instance(&self, other: &ObjectHandle) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.value, &other.value)
    }

    /// Recovers the typed handle.
    ///
    /// # Errors
    /// [`RabtError::TypeMismatch`] if the instance is not a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Result<Handle<T>> {
        let value = Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| RabtError::TypeMismatch {
                expected: type_name::<T>(),
                actual: self.key,
            })?;

        Ok(Handle {
            id: self.id,
            key: self.key,
            value,
        })
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectHandle {}

impl Hash for ObjectHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({} {})", self.key.short_name(), self.id)
    }
}

/// Typed reference to a container-owned instance.
///
/// Dereferences to `T`. Cloning is cheap and keeps the same identity. The
/// value stays alive while any handle to it exists, even after the
/// container has released it.
///
/// # Examples
/// ```
/// use rabt_container::prelude::*;
///
/// let mut container = Container::new();
/// container.register_singleton_default::<Vec<u8>>().unwrap();
///
/// let a: Handle<Vec<u8>> = container.resolve().unwrap();
/// let b = container.resolve::<Vec<u8>>().unwrap();
/// assert_eq!(a, b);
/// assert!(a.is_empty());
/// ```
pub struct Handle<T> {
    id: InstanceId,
    key: TypeKey,
    value: Arc<T>,
}

impl<T: Send + Sync + 'static> Handle<T> {
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The shared pointer behind this handle.
    #[inline]
    pub fn as_arc(&self) -> &Arc<T> {
        &self.value
    }

    /// Erases the type again.
    pub fn erase(&self) -> ObjectHandle {
        ObjectHandle::new(self.id, self.key, self.value.clone() as Instance)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            key: self.key,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Send + Sync + 'static> From<Handle<T>> for ObjectHandle {
    fn from(handle: Handle<T>) -> Self {
        ObjectHandle::new(handle.id, handle.key, handle.value as Instance)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({} {})", self.key.short_name(), self.id)
    }
}

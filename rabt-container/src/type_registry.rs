//! Name ↔ key lookup table for diagnostics.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{RabtError, Result};
use crate::key::TypeKey;

/// Records the types a container has seen.
///
/// Registration is idempotent. Lookups of types that were never recorded
/// fail with [`RabtError::UnknownType`].
///
/// # Examples
/// ```
/// use rabt_container::type_registry::TypeRegistry;
///
/// struct Clock;
///
/// let mut types = TypeRegistry::new();
/// types.register::<Clock>();
///
/// let key = types.key_for::<Clock>().unwrap();
/// assert!(types.name_for(&key).unwrap().ends_with("Clock"));
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    names: HashMap<TypeKey, &'static str>,
    keys: HashMap<&'static str, TypeKey>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `T`. Returns its key.
    pub fn register<T: ?Sized + 'static>(&mut self) -> TypeKey {
        let key = TypeKey::of::<T>();
        self.record(key);
        key
    }

    /// Records an already built key.
    pub fn record(&mut self, key: TypeKey) {
        if self.names.insert(key, key.type_name()).is_none() {
            trace!(key = %key, "Recorded type");
            self.keys.insert(key.type_name(), key);
        }
    }

    /// Returns the key for `T` if it was recorded.
    pub fn key_for<T: ?Sized + 'static>(&self) -> Result<TypeKey> {
        let key = TypeKey::of::<T>();
        if self.names.contains_key(&key) {
            Ok(key)
        } else {
            Err(RabtError::UnknownType(key.type_name().to_string()))
        }
    }

    /// Looks a key up by its fully qualified type name.
    pub fn key_for_name(&self, name: &str) -> Result<TypeKey> {
        self.keys
            .get(name)
            .copied()
            .ok_or_else(|| RabtError::UnknownType(name.to_string()))
    }

    /// Returns the diagnostic name recorded for `key`.
    pub fn name_for(&self, key: &TypeKey) -> Result<&'static str> {
        self.names
            .get(key)
            .copied()
            .ok_or_else(|| RabtError::UnknownType(key.type_name().to_string()))
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.names.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All recorded names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;
    struct Mailer;

    #[test]
    fn name_round_trip() {
        let mut types = TypeRegistry::new();
        let key = types.register::<Clock>();

        assert_eq!(types.name_for(&key).unwrap(), std::any::type_name::<Clock>());
        assert_eq!(types.key_for_name(std::any::type_name::<Clock>()).unwrap(), key);
    }

    #[test]
    fn register_is_idempotent() {
        let mut types = TypeRegistry::new();
        types.register::<Clock>();
        types.register::<Clock>();
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn unknown_type_fails() {
        let mut types = TypeRegistry::new();
        types.register::<Clock>();

        assert!(matches!(types.key_for::<Mailer>(), Err(RabtError::UnknownType(_))));
        assert!(matches!(
            types.name_for(&TypeKey::of::<Mailer>()),
            Err(RabtError::UnknownType(_))
        ));
        assert!(matches!(types.key_for_name("nope"), Err(RabtError::UnknownType(_))));
    }
}

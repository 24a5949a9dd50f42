//! Per-type instance storage.
//!
//! Transient types keep a pool of every instance the container built and
//! has not destroyed yet. Singleton types keep one cell. Each stored
//! record remembers the dependency handles its instance was built from,
//! which is what cascade destruction walks.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::error::{RabtError, Result, UnknownInstanceError};
use crate::handle::{InstanceId, ObjectHandle};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;

/// One owned instance and the arguments it was constructed from.
#[derive(Debug, Clone)]
pub(crate) struct InstanceRecord {
    pub handle: ObjectHandle,
    pub dependencies: Vec<ObjectHandle>,
}

/// Every live instance of one transient type, keyed by identity.
#[derive(Debug, Default)]
pub(crate) struct TransientPool {
    instances: HashMap<InstanceId, InstanceRecord>,
}

impl TransientPool {
    pub fn insert(&mut self, record: InstanceRecord) -> ObjectHandle {
        let handle = record.handle.clone();
        self.instances.insert(handle.id(), record);
        handle
    }

    pub fn get(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(&id)
    }

    /// Removes the record for `handle` if this pool holds that exact
    /// allocation.
    pub fn remove(&mut self, handle: &ObjectHandle) -> Option<InstanceRecord> {
        let owned = self
            .instances
            .get(&handle.id())
            .is_some_and(|record| record.handle.same_instance(handle));
        if owned {
            self.instances.remove(&handle.id())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn drain(&mut self) -> Vec<InstanceRecord> {
        self.instances.drain().map(|(_, record)| record).collect()
    }
}

/// Zero or one instance of a singleton type.
#[derive(Debug, Default)]
pub(crate) struct SingletonCell {
    slot: OnceCell<InstanceRecord>,
}

impl SingletonCell {
    pub fn get(&self) -> Option<&InstanceRecord> {
        self.slot.get()
    }

    /// Stores `record` if the cell is empty. An occupied cell keeps its
    /// instance and `record` is dropped.
    pub fn populate(&mut self, record: InstanceRecord) -> ObjectHandle {
        self.slot.get_or_init(|| record).handle.clone()
    }

    /// Empties the cell. No-op when already empty.
    pub fn clear(&mut self) -> Option<InstanceRecord> {
        self.slot.take()
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// Storage for one registered type.
#[derive(Debug)]
pub(crate) enum InstanceStore {
    Transient(TransientPool),
    Singleton(SingletonCell),
}

impl InstanceStore {
    pub fn for_lifetime(lifetime: Lifetime) -> Self {
        match lifetime {
            Lifetime::Transient => InstanceStore::Transient(TransientPool::default()),
            Lifetime::Singleton => InstanceStore::Singleton(SingletonCell::default()),
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        match self {
            InstanceStore::Transient(_) => Lifetime::Transient,
            InstanceStore::Singleton(_) => Lifetime::Singleton,
        }
    }

    /// Transient: adds the record. Singleton: populate-if-empty.
    pub fn insert(&mut self, record: InstanceRecord) -> ObjectHandle {
        match self {
            InstanceStore::Transient(pool) => pool.insert(record),
            InstanceStore::Singleton(cell) => cell.populate(record),
        }
    }

    /// The cached singleton, if any.
    pub fn cached(&self) -> Option<ObjectHandle> {
        match self {
            InstanceStore::Transient(_) => None,
            InstanceStore::Singleton(cell) => cell.get().map(|r| r.handle.clone()),
        }
    }

    /// Finds the record for `handle` without removing it.
    ///
    /// Transient stores fail when the instance is not pooled. Singleton
    /// stores return `Ok(None)` for an empty cell and fail when the cell
    /// holds a different instance.
    pub fn find(&self, key: TypeKey, handle: &ObjectHandle) -> Result<Option<&InstanceRecord>> {
        let unknown = || {
            RabtError::UnknownInstance(UnknownInstanceError {
                key,
                instance: handle.id(),
                produced_for: (handle.key() != key).then(|| handle.key()),
            })
        };

        match self {
            InstanceStore::Transient(pool) => pool
                .get(handle.id())
                .filter(|record| record.handle.same_instance(handle))
                .map(Some)
                .ok_or_else(unknown),
            InstanceStore::Singleton(cell) => match cell.get() {
                None => Ok(None),
                Some(record) if record.handle.same_instance(handle) => Ok(Some(record)),
                Some(_) => Err(unknown()),
            },
        }
    }

    /// Removes the instance behind `handle`, if this store holds it.
    ///
    /// Matches identity and allocation, like [`find`](Self::find), so a
    /// handle from another container with a colliding id removes nothing.
    pub fn remove(&mut self, handle: &ObjectHandle) -> Option<InstanceRecord> {
        match self {
            InstanceStore::Transient(pool) => pool.remove(handle),
            InstanceStore::Singleton(cell) => {
                let holds_it = cell.get().is_some_and(|r| r.handle.same_instance(handle));
                if holds_it { cell.clear() } else { None }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InstanceStore::Transient(pool) => pool.len(),
            InstanceStore::Singleton(cell) => usize::from(cell.is_occupied()),
        }
    }

    /// Releases every stored instance.
    pub fn clear(&mut self) -> Vec<InstanceRecord> {
        match self {
            InstanceStore::Transient(pool) => pool.drain(),
            InstanceStore::Singleton(cell) => cell.clear().into_iter().collect(),
        }
    }
}

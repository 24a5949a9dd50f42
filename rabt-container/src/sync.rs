//! Thread-shared container.
//!
//! [`Container`] itself is single-owner. [`SharedContainer`] puts the whole
//! container behind one [`parking_lot::Mutex`], so every registration,
//! resolution and destruction runs under a single exclusive lock.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::container::Container;
use crate::error::Result;
use crate::handle::Handle;
use crate::registry::Registration;

/// Cloneable, `Send + Sync` handle to one container.
///
/// # Examples
/// ```
/// use rabt_container::prelude::*;
///
/// let shared = SharedContainer::new(Container::new());
/// shared.lock().register_singleton_default::<String>().unwrap();
///
/// let worker = shared.clone();
/// let from_thread = std::thread::spawn(move || worker.resolve::<String>().unwrap())
///     .join()
///     .unwrap();
///
/// assert_eq!(from_thread, shared.resolve::<String>().unwrap());
/// ```
#[derive(Clone)]
pub struct SharedContainer {
    inner: Arc<Mutex<Container>>,
}

impl SharedContainer {
    pub fn new(container: Container) -> Self {
        Self {
            inner: Arc::new(Mutex::new(container)),
        }
    }

    /// Exclusive access for anything not mirrored here.
    ///
    /// Holding the guard blocks every other user of this container.
    pub fn lock(&self) -> MutexGuard<'_, Container> {
        self.inner.lock()
    }

    pub fn register(&self, registration: Registration) -> Result<()> {
        self.inner.lock().register(registration)
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Handle<T>> {
        self.inner.lock().resolve()
    }

    pub fn destroy<T: Send + Sync + 'static>(&self, handle: &Handle<T>) -> Result<()> {
        self.inner.lock().destroy(handle)
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner.lock().is_registered::<T>()
    }

    pub fn instance_count<T: ?Sized + 'static>(&self) -> usize {
        self.inner.lock().instance_count::<T>()
    }
}

impl From<Container> for SharedContainer {
    fn from(container: Container) -> Self {
        Self::new(container)
    }
}

impl fmt::Debug for SharedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(container) => f.debug_tuple("SharedContainer").field(&*container).finish(),
            None => f.write_str("SharedContainer(<locked>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::lifetime::Lifetime;

    #[test]
    fn singleton_shared_across_threads() {
        let shared = SharedContainer::new(Container::new());
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        shared
            .register(Registration::with_factory::<u64>(Lifetime::Singleton, vec![], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            }))
            .unwrap();

        let handles: Vec<Handle<u64>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| shared.resolve::<u64>().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn transients_from_threads_land_in_one_pool() {
        let shared = SharedContainer::new(Container::new());
        shared.lock().register_transient_default::<Vec<u8>>().unwrap();

        std::thread::scope(|scope| {
            for _ in 0..3 {
                scope.spawn(|| shared.resolve::<Vec<u8>>().unwrap());
            }
        });

        assert_eq!(shared.instance_count::<Vec<u8>>(), 3);
    }

    #[test]
    fn debug_reports_lock_state() {
        let shared = SharedContainer::new(Container::new());
        assert!(format!("{shared:?}").contains("Container"));

        let _guard = shared.lock();
        assert_eq!(format!("{shared:?}"), "SharedContainer(<locked>)");
    }
}

//! Dependency descriptors.
//!
//! The container never guesses what a type needs. Each registered type
//! supplies an ordered list of the [`TypeKey`]s its constructor takes,
//! either through [`Injectable`] (written by hand or generated by
//! `#[derive(Injectable)]`) or as an explicit list passed next to a
//! factory closure.
//!
//! The resolver resolves that list in order and passes the handles to the
//! constructor as [`Dependencies`], which hands them out in the same order.

use crate::error::{RabtError, Result};
use crate::handle::{Handle, ObjectHandle};
use crate::key::TypeKey;

/// A type the container can build from its declared dependencies.
///
/// `dependencies()` must list the keys in the order `construct` pulls
/// them.
///
/// # Examples
/// ```
/// use rabt_container::prelude::*;
///
/// #[derive(Default)]
/// struct Config;
///
/// struct Mailer {
///     config: Handle<Config>,
/// }
///
/// impl Injectable for Mailer {
///     fn dependencies() -> Vec<TypeKey> {
///         vec![TypeKey::of::<Config>()]
///     }
///
///     fn construct(deps: &mut Dependencies) -> Result<Self> {
///         Ok(Mailer { config: deps.next()? })
///     }
/// }
///
/// let mut container = Container::new();
/// container.register_singleton_default::<Config>().unwrap();
/// container.register_transient::<Mailer>().unwrap();
///
/// let mailer = container.resolve::<Mailer>().unwrap();
/// let config = container.resolve::<Config>().unwrap();
/// assert_eq!(mailer.config, config);
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Keys of the constructor parameters, in declaration order.
    fn dependencies() -> Vec<TypeKey>;

    /// Builds the value from resolved dependencies.
    fn construct(deps: &mut Dependencies) -> Result<Self>;
}

/// Resolved constructor arguments, in declaration order.
#[derive(Debug)]
pub struct Dependencies {
    consumer: TypeKey,
    handles: Vec<ObjectHandle>,
    cursor: usize,
}

impl Dependencies {
    pub(crate) fn new(consumer: TypeKey, handles: Vec<ObjectHandle>) -> Self {
        Self {
            consumer,
            handles,
            cursor: 0,
        }
    }

    /// The type being constructed.
    pub fn consumer(&self) -> TypeKey {
        self.consumer
    }

    /// Takes the next argument as a typed handle.
    ///
    /// # Errors
    /// - [`RabtError::MissingArgument`] when the descriptor lists fewer
    ///   dependencies than the constructor pulls
    /// - [`RabtError::TypeMismatch`] when the argument is not a `U`
    pub fn next<U: Send + Sync + 'static>(&mut self) -> Result<Handle<U>> {
        let handle = self.get(self.cursor)?;
        self.cursor += 1;
        Ok(handle)
    }

    /// Reads the argument at `index` without moving the cursor.
    pub fn get<U: Send + Sync + 'static>(&self, index: usize) -> Result<Handle<U>> {
        self.handles
            .get(index)
            .ok_or(RabtError::MissingArgument {
                consumer: self.consumer,
                index,
                declared: self.handles.len(),
            })?
            .downcast()
    }

    /// All arguments, untyped.
    pub fn handles(&self) -> &[ObjectHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Arguments not yet taken with [`Dependencies::next`].
    pub fn remaining(&self) -> usize {
        self.handles.len().saturating_sub(self.cursor)
    }

    pub(crate) fn into_handles(self) -> Vec<ObjectHandle> {
        self.handles
    }
}

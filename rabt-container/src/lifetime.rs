//! Lifetime policies.
//!
//! A lifetime decides how many instances of a type the container builds:
//! - [`Lifetime::Transient`]: a new instance for every resolution
//! - [`Lifetime::Singleton`]: one shared instance per container
use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines how a registered type is instantiated and shared.
///
/// # Examples
/// ```
/// use rabt_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// New instance built on every resolve call.
    ///
    /// Each instance is owned by the type's pool until it is destroyed,
    /// either directly or by cascade from a transient consumer.
    Transient,

    /// One instance shared by every consumer.
    ///
    /// Built on first resolve and kept until explicitly destroyed, the
    /// registration is replaced, or the container is dropped. Destroying
    /// a consumer never destroys its singleton dependencies.
    Singleton,
}

impl Lifetime {
    /// Returns `true` if resolution reuses a stored instance.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }

    /// Returns `true` if destroying a consumer also destroys this dependency.
    #[inline]
    pub fn cascades(&self) -> bool {
        matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Transient => write!(f, "Transient"),
            Lifetime::Singleton => write!(f, "Singleton"),
        }
    }
}

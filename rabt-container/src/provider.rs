//! Provider trait: a module of related registrations.
//!
//! # Examples
//! ```rust
//! use rabt_container::prelude::*;
//!
//! #[derive(Default)]
//! struct Clock;
//! #[derive(Default)]
//! struct IdGenerator;
//!
//! struct CoreProvider;
//!
//! impl Provider for CoreProvider {
//!     fn register(&self, container: &mut Container) -> Result<()> {
//!         container.register_singleton_default::<Clock>()?;
//!         container.register_transient_default::<IdGenerator>()
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.add_provider(&CoreProvider).unwrap();
//! assert!(container.is_singleton::<Clock>());
//! assert!(container.is_transient::<IdGenerator>());
//! ```

use crate::container::Container;
use crate::error::Result;

/// A module that registers related types into a container.
///
/// Split registrations by concern instead of one long block:
///
/// ```rust,ignore
/// container.add_provider(&StorageProvider)?;
/// container.add_provider(&MailProvider)?;
/// ```
pub trait Provider: Send + Sync {
    /// Register this module's types.
    fn register(&self, container: &mut Container) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

//! # rabt: a dependency injection container for Rust
//!
//! Register types with a lifetime, resolve them by type, destroy them when
//! done. The container builds every dependency a type declares, shares
//! singletons, hands out a fresh instance of a transient type on every
//! resolve, and on destruction releases the transient instances that were
//! built for the destroyed one.
//!
//! # Quick start
//! ```rust
//! use rabt::prelude::*;
//!
//! #[derive(Default)]
//! struct Config {
//!     dsn: String,
//! }
//!
//! #[derive(Injectable)]
//! struct Repository {
//!     config: Handle<Config>,
//! }
//!
//! #[derive(Injectable)]
//! struct UserService {
//!     repository: Handle<Repository>,
//!     #[inject(default)]
//!     lookups: std::sync::atomic::AtomicUsize,
//! }
//!
//! let mut container = Container::builder()
//!     .singleton_default::<Config>()
//!     .transient::<Repository>()
//!     .transient::<UserService>()
//!     .build()
//!     .expect("Failed to build container");
//!
//! let service = container.resolve::<UserService>().unwrap();
//! assert!(service.repository.config.dsn.is_empty());
//!
//! container.destroy(&service).unwrap();
//! assert_eq!(container.instance_count::<Repository>(), 0);
//! assert_eq!(container.instance_count::<Config>(), 1);
//! ```
//!
//! # Crates
//! - `rabt-container`: the container, handles, errors, providers
//! - `rabt-derive`: `#[derive(Injectable)]`
//! - `rabt-support`: diagnostic rendering helpers

pub use rabt_container::*;
pub use rabt_derive::*;
pub use rabt_support;

/// Everything needed to register, resolve and derive.
pub mod prelude {
    pub use rabt_container::prelude::*;
    pub use rabt_derive::Injectable;
}

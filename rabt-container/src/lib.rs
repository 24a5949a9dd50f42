//! Core container implementation for rabt.

pub mod config;
pub mod container;
pub mod descriptor;
pub mod error;
mod graph;
pub mod handle;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod registry;
mod store;
pub mod sync;
pub mod type_registry;

pub use container::{Container, ContainerBuilder, prelude};
pub use descriptor::{Dependencies, Injectable};
pub use error::{RabtError, Result};
pub use handle::{Handle, ObjectHandle};
pub use key::TypeKey;
pub use lifetime::Lifetime;

//! Error types for container operations.
//!
//! Every failure names the types involved, and the common mistakes come
//! with a hint about what to do next.

use std::fmt;

use rabt_support::rendering::render_chain;

use crate::handle::InstanceId;
use crate::key::TypeKey;

/// Boxed error returned by user factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all container operations.
#[derive(Debug, thiserror::Error)]
pub enum RabtError {
    /// Requested type was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A type depends on itself, directly or through other types.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Destroy was called with a handle the store does not own.
    #[error("{}", .0)]
    UnknownInstance(UnknownInstanceError),

    /// A handle was downcast to a type it does not hold.
    #[error("Type mismatch: handle holds {actual}, requested as {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: TypeKey,
    },

    /// A constructor pulled more dependencies than its descriptor declares.
    #[error(
        "{consumer} asked for dependency #{index} but its descriptor declares {declared}\n  Hint: keep Injectable::dependencies() and construct() in the same order"
    )]
    MissingArgument {
        consumer: TypeKey,
        index: usize,
        declared: usize,
    },

    /// Factory returned an error during construction.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// Type was already registered and overriding is disabled.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// Type registry lookup for a type, name or key it never recorded.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Resolution nested deeper than the configured limit.
    #[error("Resolving {key} exceeded the maximum depth of {max_depth}")]
    DepthExceeded { key: TypeKey, max_depth: usize },
}

impl RabtError {
    /// Wraps a factory error for type `key`.
    pub fn construction(key: TypeKey, source: impl Into<BoxError>) -> Self {
        RabtError::ConstructionFailed {
            key,
            source: source.into(),
        }
    }

    /// Classifies an error returned by the factory of `key`.
    ///
    /// `MissingArgument` and `TypeMismatch` already name the consumer and
    /// point at its descriptor, and `ConstructionFailed` is already
    /// wrapped; those pass through. Anything else becomes the source of a
    /// `ConstructionFailed` for `key`.
    pub(crate) fn into_construction(self, key: TypeKey) -> Self {
        match self {
            RabtError::MissingArgument { .. }
            | RabtError::TypeMismatch { .. }
            | RabtError::ConstructionFailed { .. } => self,
            other => RabtError::ConstructionFailed {
                key,
                source: Box::new(other),
            },
        }
    }
}

/// Error when a type was not registered.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The type that was requested
    pub requested: TypeKey,
    /// The consumer that needed it, if resolution was nested
    pub required_by: Option<TypeKey>,
    /// Registered type names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type not registered: {}", self.requested)?;

        if let Some(ref consumer) = self.required_by {
            write!(f, "\n  Required by: {consumer}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register it with .register_transient::<{0}>() or .register_singleton::<{0}>()",
            self.requested.short_name()
        )
    }
}

/// Error when resolution walks back into a type it is already building.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys forming the cycle, first and last are the same type.
    pub chain: Vec<TypeKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(TypeKey::short_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))
    }
}

/// Error when a handle does not belong to the store it is destroyed from.
#[derive(Debug)]
pub struct UnknownInstanceError {
    /// The type whose store was searched
    pub key: TypeKey,
    /// Identity of the handle passed in
    pub instance: InstanceId,
    /// The type the handle was produced for, when it differs from `key`
    pub produced_for: Option<TypeKey>,
}

impl fmt::Display for UnknownInstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance {} is not owned by the store of {}", self.instance, self.key)?;
        match self.produced_for {
            Some(ref other) => write!(f, "\n  The handle was produced for {other}"),
            None => write!(f, "\n  Hint: was it already destroyed?"),
        }
    }
}

/// Error when registering a type that already has a registration.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: TypeKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: enable allow_override in ContainerConfig to replace registrations"
        )
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, RabtError>;

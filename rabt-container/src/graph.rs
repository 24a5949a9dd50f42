//! Whole-graph validation.
//!
//! Resolution already fails fast on missing registrations and cycles, but
//! only for the part of the graph it touches. [`GraphValidator`] checks
//! every registration up front:
//! - every declared dependency is registered
//! - no type depends on itself, directly or transitively
//!
//! Singletons may depend on transients. The transient instance is built
//! once with the singleton and lives as long as it.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, RabtError};
use crate::key::TypeKey;
use crate::registry::RegistrationTable;

/// Validates the dependency graph of a registration table.
///
/// # Algorithm
/// Depth-first search keeping the current path. Meeting a key that is on
/// the path closes a cycle; keys that finished once are not walked again.
pub(crate) struct GraphValidator<'a> {
    table: &'a RegistrationTable,
    on_path: HashSet<TypeKey>,
    finished: HashSet<TypeKey>,
    path: Vec<TypeKey>,
}

impl<'a> GraphValidator<'a> {
    pub fn new(table: &'a RegistrationTable) -> Self {
        Self {
            table,
            on_path: HashSet::new(),
            finished: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates every registration.
    ///
    /// # Errors
    /// - [`RabtError::CircularDependency`]: cycle found
    /// - [`RabtError::NotRegistered`]: dependency without registration
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), RabtError> {
        // sorted for a deterministic first error
        let mut roots: Vec<TypeKey> = self.table.keys().copied().collect();
        roots.sort_by_key(|k| k.type_name());

        debug!(registrations = roots.len(), "Validating dependency graph");

        for key in roots {
            self.visit(key)?;
        }

        debug!("Dependency graph is valid");
        Ok(())
    }

    fn visit(&mut self, key: TypeKey) -> Result<(), RabtError> {
        if self.finished.contains(&key) {
            return Ok(());
        }

        if self.on_path.contains(&key) {
            let start = self.path.iter().position(|k| *k == key).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(key);

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(RabtError::CircularDependency(CircularDependencyError { chain }));
        }

        let table = self.table;
        let dependencies = &table.lookup_for(&key, self.path.last().copied())?.dependencies;

        self.on_path.insert(key);
        self.path.push(key);

        for dep in dependencies {
            self.visit(*dep)?;
        }

        self.path.pop();
        self.on_path.remove(&key);
        self.finished.insert(key);
        Ok(())
    }
}

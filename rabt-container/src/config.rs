//! Container settings.

use serde::{Deserialize, Serialize};

/// Behavior switches for a [`Container`](crate::container::Container).
///
/// Every field has a default, so partial configuration files work:
///
/// ```
/// use rabt_container::config::ContainerConfig;
///
/// let config = ContainerConfig::default();
/// assert!(config.allow_override);
/// assert!(config.detect_cycles);
/// assert_eq!(config.max_depth, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Re-registering a type replaces its registration. When `false`,
    /// re-registration fails with `AlreadyRegistered`.
    pub allow_override: bool,
    /// Track in-progress resolutions and fail fast on cycles.
    pub detect_cycles: bool,
    /// Deepest allowed nesting of dependency resolution.
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_override: true,
            detect_cycles: true,
            max_depth: 256,
        }
    }
}

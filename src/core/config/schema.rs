//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$ORGTREE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/orgtree/config.toml`
//! 3. `~/.orgtree/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing (log level names, positive
//! bounds, root username rules).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::Username;

/// Accepted values for `log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// data_dir = "/var/lib/orgtree"
/// log_level = "info"
///
/// [hierarchy]
/// max_depth = 10000
/// lock_retries = 8
///
/// [root]
/// username = "root"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OrgConfig {
    /// Directory holding the node store
    pub data_dir: Option<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: Option<String>,

    /// Traversal and locking bounds
    pub hierarchy: Option<HierarchyConfig>,

    /// Root bootstrap defaults
    pub root: Option<RootConfig>,
}

impl OrgConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log_level '{}', must be one of: {}",
                    level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }

        if let Some(hierarchy) = &self.hierarchy {
            hierarchy.validate()?;
        }

        if let Some(root) = &self.root {
            root.validate()?;
        }

        Ok(())
    }
}

/// Bounds on hierarchy operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HierarchyConfig {
    /// Maximum boss links followed by an ancestry walk
    pub max_depth: Option<usize>,

    /// Attempts to lock a worker whose boss keeps changing
    pub lock_retries: Option<u32>,
}

impl HierarchyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == Some(0) {
            return Err(ConfigError::InvalidValue(
                "hierarchy.max_depth must be at least 1".into(),
            ));
        }
        if self.lock_retries == Some(0) {
            return Err(ConfigError::InvalidValue(
                "hierarchy.lock_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Root bootstrap settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RootConfig {
    /// Username used by `orgtree init` when none is given
    pub username: Option<String>,
}

impl RootConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.username {
            Username::new(name.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("root.username: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_valid() {
        let config: OrgConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, OrgConfig::default());
    }

    #[test]
    fn full_config_parses() {
        let config: OrgConfig = toml::from_str(
            r#"
            data_dir = "/tmp/org"
            log_level = "debug"

            [hierarchy]
            max_depth = 50
            lock_retries = 3

            [root]
            username = "boss"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/org")));
        let hierarchy = config.hierarchy.unwrap();
        assert_eq!(hierarchy.max_depth, Some(50));
        assert_eq!(hierarchy.lock_retries, Some(3));
    }

    #[test]
    fn unknown_log_level_rejected() {
        let config: OrgConfig = toml::from_str("log_level = \"loud\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_bounds_rejected() {
        let config: OrgConfig = toml::from_str("[hierarchy]\nmax_depth = 0").unwrap();
        assert!(config.validate().is_err());

        let config: OrgConfig = toml::from_str("[hierarchy]\nlock_retries = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_root_username_rejected() {
        let config: OrgConfig = toml::from_str("[root]\nusername = \"two words\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<OrgConfig, _> = toml::from_str("colour = \"blue\"");
        assert!(result.is_err());

        let result: Result<OrgConfig, _> = toml::from_str("[hierarchy]\nwidth = 3");
        assert!(result.is_err());
    }
}

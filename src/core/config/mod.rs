//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$ORGTREE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/orgtree/config.toml`
//! 3. `~/.orgtree/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use orgtree::core::config::Config;
//!
//! let result = Config::load().unwrap();
//! let config = result.config;
//!
//! println!("Data dir: {}", config.data_dir().unwrap().display());
//! println!("Max depth: {}", config.max_depth());
//! ```

pub mod schema;

pub use schema::{HierarchyConfig, OrgConfig, RootConfig, LOG_LEVELS};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default bound on ancestry walks.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Default attempts to lock a worker whose boss keeps moving.
pub const DEFAULT_LOCK_RETRIES: u32 = 8;

/// Default root username for `orgtree init`.
pub const DEFAULT_ROOT_USERNAME: &str = "root";

/// Default tracing filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Keys accepted by [`Config::value`] and [`Config::set_value`].
pub const KEYS: &[&str] = &[
    "data_dir",
    "log_level",
    "hierarchy.max_depth",
    "hierarchy.lock_retries",
    "root.username",
];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: OrgConfig,
    /// Path the file was loaded from, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. A missing file is not an error (defaults are used).
    pub fn load() -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Load with an explicit environment lookup and home directory.
    pub fn load_with(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let mut candidates = Vec::new();
        if let Some(path) = env("ORGTREE_CONFIG") {
            let path = PathBuf::from(path);
            if !path.exists() {
                warnings.push(ConfigWarning {
                    message: "ORGTREE_CONFIG points to a missing file; falling back".into(),
                    path: path.clone(),
                });
            }
            candidates.push(path);
        }
        if let Some(xdg) = env("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg).join("orgtree/config.toml"));
        }
        if let Some(home) = home {
            candidates.push(home.join(".orgtree/config.toml"));
        }

        for path in candidates {
            if path.exists() {
                let file = Self::read_config(&path)?;
                file.validate()?;
                return Ok(ConfigLoadResult {
                    config: Config {
                        file,
                        path: Some(path),
                    },
                    warnings,
                });
            }
        }

        Ok(ConfigLoadResult {
            config: Config::default(),
            warnings,
        })
    }

    /// Read and parse a config file.
    pub fn read_config(path: &Path) -> Result<OrgConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Canonical write path.
    ///
    /// `$ORGTREE_CONFIG` when set, otherwise `~/.orgtree/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("ORGTREE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".orgtree/config.toml"))
    }

    /// Write the config file atomically to [`Config::config_path`].
    pub fn write(config: &OrgConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically (temp file, then rename).
    pub fn write_config_atomic(path: &Path, config: &OrgConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directory holding the node store.
    ///
    /// Defaults to `~/.orgtree/data`.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.file.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                Ok(home.join(".orgtree/data"))
            }
        }
    }

    /// Tracing filter used when `RUST_LOG` is unset. Defaults to "warn".
    pub fn log_level(&self) -> &str {
        self.file.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn max_depth(&self) -> usize {
        self.file
            .hierarchy
            .as_ref()
            .and_then(|h| h.max_depth)
            .unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn lock_retries(&self) -> u32 {
        self.file
            .hierarchy
            .as_ref()
            .and_then(|h| h.lock_retries)
            .unwrap_or(DEFAULT_LOCK_RETRIES)
    }

    pub fn root_username(&self) -> &str {
        self.file
            .root
            .as_ref()
            .and_then(|r| r.username.as_deref())
            .unwrap_or(DEFAULT_ROOT_USERNAME)
    }

    /// Path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Key access for `orgtree config`
    // =========================================================================

    /// Value explicitly set in the file for `key`, if any.
    pub fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let f = &self.file;
        let value = match key {
            "data_dir" => f.data_dir.as_ref().map(|p| p.display().to_string()),
            "log_level" => f.log_level.clone(),
            "hierarchy.max_depth" => f
                .hierarchy
                .as_ref()
                .and_then(|h| h.max_depth)
                .map(|v| v.to_string()),
            "hierarchy.lock_retries" => f
                .hierarchy
                .as_ref()
                .and_then(|h| h.lock_retries)
                .map(|v| v.to_string()),
            "root.username" => f.root.as_ref().and_then(|r| r.username.clone()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Effective value for `key`, with defaults applied.
    pub fn effective_value(&self, key: &str) -> Result<String, ConfigError> {
        Ok(match key {
            "data_dir" => self.data_dir()?.display().to_string(),
            "log_level" => self.log_level().to_string(),
            "hierarchy.max_depth" => self.max_depth().to_string(),
            "hierarchy.lock_retries" => self.lock_retries().to_string(),
            "root.username" => self.root_username().to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        })
    }

    /// Set `key` to `value` in the file contents and re-validate.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parse_num = |v: &str| {
            v.parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue(format!("{} expects a number, got '{}'", key, v)))
        };

        let f = &mut self.file;
        match key {
            "data_dir" => f.data_dir = Some(PathBuf::from(value)),
            "log_level" => f.log_level = Some(value.to_string()),
            "hierarchy.max_depth" => {
                f.hierarchy.get_or_insert_with(Default::default).max_depth =
                    Some(parse_num(value)? as usize)
            }
            "hierarchy.lock_retries" => {
                let n = u32::try_from(parse_num(value)?)
                    .map_err(|_| ConfigError::InvalidValue(format!("{} is too large", key)))?;
                f.hierarchy.get_or_insert_with(Default::default).lock_retries = Some(n)
            }
            "root.username" => {
                f.root.get_or_insert_with(Default::default).username = Some(value.to_string())
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        self.file.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(vars: &[(&str, PathBuf)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.display().to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn load_empty_defaults() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_with(env_of(&[]), Some(temp.path().to_path_buf())).unwrap();
        let config = result.config;

        assert!(config.loaded_from().is_none());
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(config.lock_retries(), DEFAULT_LOCK_RETRIES);
        assert_eq!(config.root_username(), "root");
        assert_eq!(config.log_level(), "warn");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_from_env_var() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[hierarchy]\nmax_depth = 12\n").unwrap();

        let result = Config::load_with(env_of(&[("ORGTREE_CONFIG", path.clone())]), None).unwrap();

        assert_eq!(result.config.max_depth(), 12);
        assert_eq!(result.config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn env_var_wins_over_xdg() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("explicit.toml");
        fs::write(&explicit, "log_level = \"debug\"").unwrap();
        let xdg = temp.path().join("xdg");
        fs::create_dir_all(xdg.join("orgtree")).unwrap();
        fs::write(xdg.join("orgtree/config.toml"), "log_level = \"error\"").unwrap();

        let env = env_of(&[("ORGTREE_CONFIG", explicit), ("XDG_CONFIG_HOME", xdg)]);
        let result = Config::load_with(env, None).unwrap();
        assert_eq!(result.config.log_level(), "debug");
    }

    #[test]
    fn missing_env_target_warns_and_falls_back() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(home.join(".orgtree")).unwrap();
        fs::write(home.join(".orgtree/config.toml"), "[root]\nusername = \"chief\"").unwrap();

        let env = env_of(&[("ORGTREE_CONFIG", temp.path().join("nope.toml"))]);
        let result = Config::load_with(env, Some(home)).unwrap();

        assert_eq!(result.config.root_username(), "chief");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn invalid_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "log_level = \"chatty\"").unwrap();

        let result = Config::load_with(env_of(&[("ORGTREE_CONFIG", path)]), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn malformed_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "data_dir = [").unwrap();

        let result = Config::load_with(env_of(&[("ORGTREE_CONFIG", path)]), None);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn write_atomic_then_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let mut config = Config::default();
        config.set_value("hierarchy.lock_retries", "3").unwrap();
        config.set_value("data_dir", "/srv/org").unwrap();
        Config::write_config_atomic(&path, &config.file).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = Config::read_config(&path).unwrap();
        assert_eq!(loaded, config.file);
    }

    #[test]
    fn key_access() {
        let mut config = Config::default();
        assert_eq!(config.value("root.username").unwrap(), None);
        assert_eq!(config.effective_value("root.username").unwrap(), "root");

        config.set_value("root.username", "chief").unwrap();
        assert_eq!(config.value("root.username").unwrap().as_deref(), Some("chief"));

        assert!(matches!(
            config.set_value("colour", "blue"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(config.set_value("hierarchy.max_depth", "many").is_err());
        assert!(config.set_value("hierarchy.max_depth", "0").is_err());
        assert!(config.value("nope").is_err());
    }

    #[test]
    fn every_listed_key_is_readable() {
        let config = Config {
            file: OrgConfig {
                data_dir: Some(PathBuf::from("/d")),
                ..Default::default()
            },
            path: None,
        };
        for key in KEYS {
            assert!(config.effective_value(key).is_ok(), "{}", key);
        }
    }
}

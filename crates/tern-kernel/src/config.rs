//! Configuration for tern.
//!
//! Configuration is loaded from `~/.config/tern/config.toml`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexer::LexerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Tokenizer switches applied to new token streams.
    #[serde(default)]
    pub lexer: LexerOptions,

    /// Process spawning.
    #[serde(default)]
    pub spawn: SpawnConfig,
}

/// Settings for [`crate::spawn::SystemSpawner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Search path used when an invocation's environment has no `PATH`.
    #[serde(default = "default_path")]
    pub default_path: String,

    /// Start children from this process's environment instead of an empty
    /// one. The invocation's environment is applied on top either way.
    #[serde(default)]
    pub inherit_env: bool,
}

fn default_path() -> String {
    "/usr/local/bin:/usr/bin:/bin".to_string()
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            default_path: default_path(),
            inherit_env: false,
        }
    }
}

impl ShellConfig {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "tern").ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert!(!config.lexer.suppress_newlines);
        assert!(config.lexer.resolve_keywords);
        assert!(config.lexer.resolve_aliases);
        assert_eq!(config.spawn.default_path, "/usr/local/bin:/usr/bin:/bin");
        assert!(!config.spawn.inherit_env);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[lexer]
suppress_newlines = true
resolve_aliases = false

[spawn]
default_path = "/opt/bin"
inherit_env = true
"#;

        let config: ShellConfig = toml::from_str(toml).expect("parse failed");
        assert!(config.lexer.suppress_newlines);
        assert!(config.lexer.resolve_keywords);
        assert!(!config.lexer.resolve_aliases);
        assert_eq!(config.spawn.default_path, "/opt/bin");
        assert!(config.spawn.inherit_env);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ShellConfig = toml::from_str("").expect("parse failed");
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("tern-config-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.toml");
        std::fs::write(&path, "[spawn]\ndefault_path = \"/x\"\n").expect("write");

        let config = ShellConfig::load_from(&path).expect("load");
        assert_eq!(config.spawn.default_path, "/x");

        let missing = dir.join("missing.toml");
        assert!(matches!(
            ShellConfig::load_from(&missing),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(&path, "[spawn\n").expect("write");
        assert!(matches!(
            ShellConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}

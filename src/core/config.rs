//! Configuration file management.
//!
//! Reads and validates `config.toml`. The file is optional: a missing file
//! means defaults.
//!
//! Lookup order:
//! 1. an explicit path (`--config`)
//! 2. `$GPGHIGH_CONFIG`
//! 3. `<config dir>/gpghigh/config.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineConfig,
    pub files: FilesConfig,
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Program name or path, resolved on `PATH`
    pub program: String,
    /// Passed to gpg as `--homedir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homedir: Option<PathBuf>,
    pub min_version: String,
    /// Report the session key on decryption
    pub show_session_key: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: constants::DEFAULT_PROGRAM.to_string(),
            homedir: None,
            min_version: constants::DEFAULT_MIN_VERSION.to_string(),
            show_session_key: false,
        }
    }
}

/// `[files]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Backup extension for recipient changes; `None` removes the original
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_extension: Option<String>,
    /// Armor text signatures
    pub armor: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            backup_extension: Some(constants::DEFAULT_BACKUP_EXTENSION.to_string()),
            armor: true,
        }
    }
}

impl Config {
    /// Path the configuration is read from, if one can be determined.
    pub fn path(explicit: Option<&Path>) -> Option<PathBuf> {
        resolve_path(
            explicit,
            std::env::var_os(constants::CONFIG_ENV).map(PathBuf::from),
            dirs::config_dir(),
        )
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise a missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile`, `ConfigError::Parse` or
    /// `ConfigError::InvalidValue`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::path(explicit) else {
            debug!("no config location, using defaults");
            return Ok(Self::default());
        };

        if explicit.is_none() && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::from_file(&path)
    }

    /// Read and validate one file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        debug!(program = %config.engine.program, "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty program, a
    /// malformed minimum version, or an unusable backup extension.
    pub fn validate(&self) -> Result<()> {
        if self.engine.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.program",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        let version_ok = self
            .engine
            .min_version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !version_ok {
            return Err(ConfigError::InvalidValue {
                field: "engine.min_version",
                reason: format!("not a dotted version: {}", self.engine.min_version),
            }
            .into());
        }

        if let Some(ext) = &self.files.backup_extension {
            if ext.is_empty() || ext.contains('/') || ext.contains(std::path::MAIN_SEPARATOR) {
                return Err(ConfigError::InvalidValue {
                    field: "files.backup_extension",
                    reason: format!("not a file extension: {:?}", ext),
                }
                .into());
            }
        }

        Ok(())
    }
}

fn resolve_path(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(env.filter(|p| !p.as_os_str().is_empty()))
        .or_else(|| config_dir.map(|d| d.join(constants::APP_DIR).join(constants::CONFIG_FILE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.program, "gpg");
        assert_eq!(config.engine.min_version, "2.2.0");
        assert!(!config.engine.show_session_key);
        assert_eq!(config.files.backup_extension.as_deref(), Some(".bak"));
        assert!(config.files.armor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
[engine]
homedir = "/tmp/gnupg"
show_session_key = true

[files]
armor = false
"#,
        )
        .unwrap();
        assert_eq!(config.engine.program, "gpg");
        assert_eq!(config.engine.homedir, Some(PathBuf::from("/tmp/gnupg")));
        assert!(config.engine.show_session_key);
        assert!(!config.files.armor);
        assert_eq!(config.files.backup_extension.as_deref(), Some(".bak"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::parse("[engine]\nprogramme = \"gpg2\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        for toml in [
            "[engine]\nprogram = \"  \"\n",
            "[engine]\nmin_version = \"2.x\"\n",
            "[engine]\nmin_version = \"\"\n",
            "[files]\nbackup_extension = \"\"\n",
            "[files]\nbackup_extension = \"a/b\"\n",
        ] {
            let err = Config::parse(toml).unwrap_err();
            assert!(
                matches!(err, Error::Config(ConfigError::InvalidValue { .. })),
                "{toml}"
            );
        }
    }

    #[test]
    fn test_resolve_order() {
        let explicit = Path::new("/etc/explicit.toml");
        let env = PathBuf::from("/env.toml");
        let dir = PathBuf::from("/home/u/.config");

        assert_eq!(
            resolve_path(Some(explicit), Some(env.clone()), Some(dir.clone())),
            Some(explicit.to_path_buf())
        );
        assert_eq!(
            resolve_path(None, Some(env.clone()), Some(dir.clone())),
            Some(env)
        );
        assert_eq!(
            resolve_path(None, Some(PathBuf::new()), Some(dir.clone())),
            Some(dir.join("gpghigh").join("config.toml"))
        );
        assert_eq!(resolve_path(None, None, None), None);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[engine]\nprogram = \"gpg2\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.engine.program, "gpg2");
    }
}

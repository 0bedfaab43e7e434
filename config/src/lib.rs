//! Configuration loading for Bestiary.
//!
//! The optional TOML file lives at `$BESTIARY_CONFIG` or
//! `<config dir>/bestiary/config.toml`:
//!
//! ```toml
//! [storage]
//! path = "${HOME}/.bestiary/cfg.json"
//! debounce_secs = 5
//!
//! [auth]
//! admin_names = ["dokutah"]
//! ```
//!
//! String values may reference environment variables as `${NAME}`. The admin
//! seed is never read from the file; see [`Settings`] for the environment
//! overrides.

mod settings;

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

pub use settings::{DEFAULT_DATA_PATH, DEFAULT_DEBOUNCE, Settings};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "BESTIARY_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct BestiaryConfig {
    pub storage: Option<StorageConfig>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Location of the persisted catalog file.
    pub path: Option<String>,
    /// Minimum seconds between two debounced writes.
    pub debounce_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub admin_names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    // The value is a secret; it is never echoed back.
    #[error("SEED is not a valid integer")]
    InvalidSeed,
    #[error("ADMIN_NAMES must be a JSON array of strings or a comma-separated list")]
    InvalidAdminNames,
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidDuration { var: &'static str, value: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl BestiaryConfig {
    /// Load the config file if one exists. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to read config: {err}");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        Self::parse(&content).map_err(|err| {
            tracing::warn!(path = %path.display(), "Failed to parse config: {err}");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_PATH_VAR)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join("bestiary").join("config.toml"))
}

/// Replace `${NAME}` references using `lookup`. Unknown names expand to "".
pub fn expand_env_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &rest[open + 2..open + 2 + close];
        if !var.is_empty() {
            out.push_str(&lookup(var).unwrap_or_default());
        }
        rest = &rest[open + 2 + close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars_with("hello world", vars(&[])), "hello world");
    }

    #[test]
    fn expand_env_vars_replaces_and_drops_missing() {
        let lookup = vars(&[("HOME", "/home/dokutah")]);
        assert_eq!(
            expand_env_vars_with("${HOME}/.bestiary/${MISSING}cfg.json", lookup),
            "/home/dokutah/.bestiary/cfg.json"
        );
    }

    #[test]
    fn expand_env_vars_adjacent_and_empty_names() {
        let lookup = vars(&[("A", "X"), ("B", "Y")]);
        assert_eq!(expand_env_vars_with("${A}${B}-${}", lookup), "XY-");
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(
            expand_env_vars_with("test ${UNCLOSED", vars(&[])),
            "test ${UNCLOSED"
        );
    }

    #[test]
    fn parse_reads_all_sections() {
        let config = BestiaryConfig::parse(
            r#"
            [storage]
            path = "/srv/beasts.json"
            debounce_secs = 2

            [auth]
            admin_names = ["dokutah", "amiya"]
            "#,
        )
        .unwrap();

        let storage = config.storage.unwrap();
        assert_eq!(storage.path.as_deref(), Some("/srv/beasts.json"));
        assert_eq!(storage.debounce_secs, Some(2));
        assert_eq!(config.auth.unwrap().admin_names, ["dokutah", "amiya"]);
    }

    #[test]
    fn parse_allows_empty_file() {
        let config = BestiaryConfig::parse("").unwrap();
        assert!(config.storage.is_none());
        assert!(config.auth.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage\npath = 1").unwrap();

        let err = BestiaryConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BestiaryConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::{BestiaryConfig, ConfigError, expand_env_vars_with};

pub const DEFAULT_DATA_PATH: &str = "instance/cfg.json";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

const DATA_PATH_VAR: &str = "BESTIARY_DATA";
const DEBOUNCE_VAR: &str = "BESTIARY_DEBOUNCE_SECS";
const SEED_VAR: &str = "SEED";
const ADMIN_NAMES_VAR: &str = "ADMIN_NAMES";

/// Effective runtime settings: config file values with environment overrides.
///
/// Precedence is environment, then file, then built-in default. The seed only
/// comes from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub debounce: Duration,
    pub admin_names: Vec<String>,
    pub seed: Option<i64>,
}

// Manual Debug impl to keep the seed out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("data_path", &self.data_path)
            .field("debounce", &self.debounce)
            .field("admin_names", &self.admin_names)
            .field("seed", &self.seed.map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Settings {
    pub fn from_env(config: Option<&BestiaryConfig>) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| env::var(name).ok())
    }

    pub fn resolve(
        config: Option<&BestiaryConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let storage = config.and_then(|c| c.storage.as_ref());

        let data_path = lookup(DATA_PATH_VAR)
            .or_else(|| storage.and_then(|s| s.path.clone()))
            .map_or_else(
                || PathBuf::from(DEFAULT_DATA_PATH),
                |raw| PathBuf::from(expand_env_vars_with(&raw, &lookup)),
            );

        let debounce = match lookup(DEBOUNCE_VAR) {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                ConfigError::InvalidDuration {
                    var: DEBOUNCE_VAR,
                    value: raw.clone(),
                }
            })?),
            None => storage
                .and_then(|s| s.debounce_secs)
                .map_or(DEFAULT_DEBOUNCE, Duration::from_secs),
        };

        let admin_names = match lookup(ADMIN_NAMES_VAR) {
            Some(raw) => parse_admin_names(&raw)?,
            None => config
                .and_then(|c| c.auth.as_ref())
                .map(|auth| auth.admin_names.clone())
                .unwrap_or_default(),
        };

        let seed = lookup(SEED_VAR)
            .map(|raw| raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidSeed))
            .transpose()?;

        Ok(Self {
            data_path,
            debounce,
            admin_names,
            seed,
        })
    }
}

/// Accepts `["a", "b"]` (JSON) or `a, b`.
fn parse_admin_names(raw: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|_| ConfigError::InvalidAdminNames);
    }
    Ok(trimmed
        .split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect())
}

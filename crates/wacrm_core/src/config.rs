//! Runtime configuration.
//!
//! # Responsibility
//! - Load `CoreConfig` by merging compiled defaults, an optional JSON file
//!   and `WACRM_*` environment variables, later layers winning.
//!
//! # Invariants
//! - Loading never touches the database or the logger; callers pass the
//!   result to `db::open_from_config` and `logging::init_logging_from_config`.

use crate::logging::default_log_level;
use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "WACRM_";
pub const ENV_DB_PATH: &str = "WACRM_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "WACRM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WACRM_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "WACRM_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Core runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Configuration load failure.
#[derive(Debug)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    Missing { path: PathBuf },
    /// Merged layers do not form a valid `CoreConfig`.
    Invalid(Box<figment::Error>),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "config file `{}` not found", path.display()),
            Self::Invalid(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Missing { .. } => None,
            Self::Invalid(err) => Some(err.as_ref()),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Invalid(Box::new(value))
    }
}

impl CoreConfig {
    /// Defaults merged with an inline JSON document; no environment layer.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::string(raw))
            .extract()?)
    }

    /// Defaults, then the file at `path`, then `WACRM_*` variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::figment(Some(path)).extract()?)
    }

    /// Defaults plus `WACRM_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::figment(None).extract()?)
    }

    /// The layered provider chain, before extraction.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Json::file(path));
        }
        figment.merge(env_provider())
    }
}

/// `WACRM_DB_PATH` feeds `database_path`; other keys map by name.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
        .only(&["db_path", "log_level", "log_dir", "busy_timeout_ms"])
        .map(|key| match key.as_str() {
            "db_path" => "database_path".into(),
            other => other.to_string().into(),
        })
}

//! Layered runtime configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional TOML
//! file, then `RACING_`-prefixed environment variables where `__` separates
//! nesting levels (`RACING_DATABASE__PATH`, `RACING_LOGGING__LEVEL`).

use crate::logging::default_log_level;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RACING";

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path; `None` keeps the database in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

/// Demo data settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
}

fn default_seed_enabled() -> bool {
    true
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_seed_enabled(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacingConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

impl RacingConfig {
    /// Loads configuration from defaults, `file` (if it exists) and the
    /// process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, Environment::with_prefix(ENV_PREFIX))
    }

    /// Parses a TOML document layered over defaults, ignoring the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn load_with_env(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::{RacingConfig, ENV_PREFIX};
    use config::{Environment, Map};
    use std::io::Write;
    use std::path::PathBuf;

    fn env_source(pairs: &[(&str, &str)]) -> Environment {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<Map<String, String>>();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_use_memory_database_and_seed() {
        let config = RacingConfig::load_with_env(None, env_source(&[])).unwrap();
        assert_eq!(config, RacingConfig::default());
        assert!(config.database.path.is_none());
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.seed.enabled);
    }

    #[test]
    fn toml_overrides_defaults_per_field() {
        let config = RacingConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/racing/races.db"

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/racing/races.db"))
        );
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.logging.level, "warn");
        assert!(config.seed.enabled);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[seed]\nenabled = true\n[database]\nbusy_timeout_ms = 100").unwrap();

        let config = RacingConfig::load_with_env(
            Some(file.path()),
            env_source(&[
                ("RACING_SEED__ENABLED", "false"),
                ("RACING_DATABASE__BUSY_TIMEOUT_MS", "250"),
            ]),
        )
        .unwrap();

        assert!(!config.seed.enabled);
        assert_eq!(config.database.busy_timeout_ms, 250);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = RacingConfig::load_with_env(
            Some(std::path::Path::new("/nonexistent/racing.toml")),
            env_source(&[]),
        )
        .unwrap();
        assert_eq!(config, RacingConfig::default());
    }
}

//! Configuration loader for coffeemate.
//!
//! Reads `config.toml` from the data directory (`~/.coffeemate/` in
//! production) or from an explicit `--config` path, then applies environment
//! overrides. A missing or malformed default file falls back to defaults; an
//! explicitly requested file must exist and parse.

use std::path::{Path, PathBuf};

use coffeemate_types::config::AppConfig;
use coffeemate_types::error::ConfigError;

use crate::sqlite::pool::DATABASE_FILE;

pub const ENV_DATA_DIR: &str = "COFFEEMATE_DATA_DIR";
pub const ENV_DATABASE_PATH: &str = "COFFEEMATE_DATABASE_PATH";
pub const ENV_TEST_MODE: &str = "COFFEEMATE_TEST_MODE";

/// Resolve the data directory.
///
/// Priority: `COFFEEMATE_DATA_DIR`, then `~/.coffeemate`, then `./.coffeemate`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(ENV_DATA_DIR).ok())
}

fn data_dir_from(env_dir: Option<String>) -> PathBuf {
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".coffeemate");
    }

    PathBuf::from(".coffeemate")
}

/// The SQLite file: configured path, else `{data_dir}/coffeemate.db`.
pub fn database_path(config: &AppConfig, data_dir: &Path) -> PathBuf {
    config
        .database_path
        .clone()
        .unwrap_or_else(|| data_dir.join(DATABASE_FILE))
}

/// Load configuration and apply environment overrides.
///
/// - `explicit = None`: reads `{data_dir}/config.toml`; a missing file yields
///   defaults, an unreadable or malformed one yields defaults with a warning.
/// - `explicit = Some(path)`: the file must exist, parse and validate.
pub async fn load_config(data_dir: &Path, explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_config_file(path).await?,
        None => load_default_config(data_dir).await,
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if config.test_mode {
        config.enable_test_mode();
    }
    Ok(config)
}

async fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

async fn load_default_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => match config.validate() {
            Ok(()) => config,
            Err(err) => {
                tracing::warn!("Invalid {}: {err}, using defaults", config_path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            AppConfig::default()
        }
    }
}

/// Apply `COFFEEMATE_DATABASE_PATH` and `COFFEEMATE_TEST_MODE` from `lookup`.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|p| !p.is_empty()) {
        config.database_path = Some(PathBuf::from(path));
    }

    if let Some(flag) = lookup(ENV_TEST_MODE) {
        match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.test_mode = true,
            "0" | "false" | "no" | "off" | "" => config.test_mode = false,
            other => tracing::warn!("Ignoring {ENV_TEST_MODE}={other}: expected true/false"),
        }
    }
}

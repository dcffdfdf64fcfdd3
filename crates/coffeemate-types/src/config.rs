//! Runtime configuration types for coffeemate.
//!
//! `AppConfig` represents the `config.toml` in the data directory. Every
//! field has a default so an empty or missing file is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schedule::DailyTime;

/// Signup window used in test mode.
pub const TEST_SIGNUP_WINDOW_SECS: u64 = 60;

/// Longest accepted signup window: one day.
pub const MAX_SIGNUP_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Closer poll interval used in test mode.
pub const TEST_CLOSE_INTERVAL_SECS: u64 = 5;

/// Top-level configuration consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seeded into the settings row when none exists yet. The stored value
    /// wins afterwards (change it with `coffeemate set-time`).
    #[serde(default)]
    pub default_daily_time: DailyTime,

    /// How long the signup window stays open after the invite.
    #[serde(default = "default_signup_window_secs")]
    pub signup_window_secs: u64,

    /// Poll interval of the closer loop.
    #[serde(default = "default_close_interval_secs")]
    pub close_interval_secs: u64,

    /// How often the daily loop re-reads the configured time.
    #[serde(default = "default_reconfigure_interval_secs")]
    pub reconfigure_interval_secs: u64,

    /// Degraded mode: short window, fast closer, no daily loop, immediate
    /// invites and placeholder participants for lone signups.
    #[serde(default)]
    pub test_mode: bool,

    /// SQLite file; defaults to `{data_dir}/coffeemate.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_signup_window_secs() -> u64 {
    30 * 60
}

fn default_close_interval_secs() -> u64 {
    30
}

fn default_reconfigure_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_daily_time: DailyTime::default(),
            signup_window_secs: default_signup_window_secs(),
            close_interval_secs: default_close_interval_secs(),
            reconfigure_interval_secs: default_reconfigure_interval_secs(),
            test_mode: false,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Switch to test mode, overriding the window and closer interval.
    pub fn enable_test_mode(&mut self) {
        self.test_mode = true;
        self.signup_window_secs = TEST_SIGNUP_WINDOW_SECS;
        self.close_interval_secs = TEST_CLOSE_INTERVAL_SECS;
    }

    /// Reject values the engine cannot schedule with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signup_window_secs > MAX_SIGNUP_WINDOW_SECS {
            return Err(ConfigError::InvalidValue(format!(
                "signup_window_secs = {} exceeds the maximum of {MAX_SIGNUP_WINDOW_SECS}",
                self.signup_window_secs
            )));
        }
        Ok(())
    }

    /// The signup window, capped at [`MAX_SIGNUP_WINDOW_SECS`].
    pub fn signup_window(&self) -> chrono::TimeDelta {
        let secs = self.signup_window_secs.min(MAX_SIGNUP_WINDOW_SECS) as i64;
        chrono::TimeDelta::try_seconds(secs).unwrap_or(chrono::TimeDelta::zero())
    }

    pub fn close_interval(&self) -> Duration {
        Duration::from_secs(self.close_interval_secs.max(1))
    }

    pub fn reconfigure_interval(&self) -> Duration {
        Duration::from_secs(self.reconfigure_interval_secs.max(1))
    }
}

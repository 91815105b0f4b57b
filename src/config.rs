//! Configuration loading and management
//!
//! Handles parsing of `learnboard.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analytics::DEFAULT_TREND_DAYS;
use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::filter::SortKey;
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::task::TaskPriority;

pub const CONFIG_FILE: &str = "learnboard.toml";

const MAX_TREND_DAYS: u32 = 365;
const MAX_LOCK_TIMEOUT_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Board display and defaults
    #[serde(default)]
    pub board: BoardConfig,

    /// Analytics report settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// File access settings
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Timezone that decides where a calendar day starts
    #[serde(default)]
    pub calendar: Calendar,

    /// Sort used when a command does not pass `--sort`
    #[serde(default)]
    pub default_sort: SortKey,

    /// Priority for tasks added without `--priority`
    #[serde(default)]
    pub default_priority: TaskPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Number of days in the completion trend
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

fn default_trend_days() -> u32 {
    DEFAULT_TREND_DAYS
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_days: default_trend_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long to wait for another `lb` process to release a file
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

pub fn validate_trend_days(days: u32, field: &str) -> Result<()> {
    if days == 0 || days > MAX_TREND_DAYS {
        return Err(Error::InvalidConfig(format!(
            "{field} must be between 1 and {MAX_TREND_DAYS} (got {days})"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration if the file exists, otherwise return defaults.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        crate::lock::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_trend_days(self.analytics.trend_days, "analytics.trend_days")?;
        let timeout = self.storage.lock_timeout_ms;
        if timeout == 0 || timeout > MAX_LOCK_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "storage.lock_timeout_ms must be between 1 and {MAX_LOCK_TIMEOUT_MS} (got {timeout})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_reads_all_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[board]
calendar = "utc"
default_sort = "due_date"
default_priority = "high"

[analytics]
trend_days = 14

[storage]
lock_timeout_ms = 750
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.board.calendar, Calendar::Utc);
        assert_eq!(cfg.board.default_sort, SortKey::DueDate);
        assert_eq!(cfg.board.default_priority, TaskPriority::High);
        assert_eq!(cfg.analytics.trend_days, 14);
        assert_eq!(cfg.storage.lock_timeout_ms, 750);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[board]\ncalendar = \"utc\"").expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.board.calendar, Calendar::Utc);
        assert_eq!(cfg.board.default_sort, SortKey::Board);
        assert_eq!(cfg.analytics.trend_days, 30);
        assert_eq!(cfg.storage.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[analytics]\ntrend_days = 0").expect("write config");
        match Config::load(&path).expect_err("invalid config") {
            Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }

        fs::write(&path, "[board]\ncalendar = \"mars\"").expect("write config");
        match Config::load(&path).expect_err("invalid config") {
            Error::TomlParse(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_or_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_or_default(&dir.path().join(CONFIG_FILE)).expect("defaults");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let mut cfg = Config::default();
        cfg.board.default_sort = SortKey::Alphabetical;
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("default_sort = \"alphabetical\""));
        assert_eq!(Config::load(&path).expect("reload"), cfg);
    }
}

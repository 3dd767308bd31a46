//! Engine configuration, read once at startup.

use std::str::FromStr;

use crate::infrastructure::recommendation::DEFAULT_NOTIFY_TIMEOUT_SECS;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://overman.db";

/// Coins charged for freezing a missed habit day.
pub const DEFAULT_HABIT_FREEZE_COST: i64 = 50;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// `None` disables quest-set notifications.
    pub recommendation_base_url: Option<String>,
    pub notify_timeout_secs: u64,
    pub habit_freeze_cost: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            recommendation_base_url: None,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            habit_freeze_cost: DEFAULT_HABIT_FREEZE_COST,
        }
    }
}

impl EngineConfig {
    /// Build from process environment variables.
    ///
    /// - `DATABASE_URL`
    /// - `DATABASE_MAX_CONNECTIONS`
    /// - `RECOMMENDATION_BASE_URL`
    /// - `NOTIFY_TIMEOUT_SECS`
    /// - `HABIT_FREEZE_COST`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: value("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse(&value, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            recommendation_base_url: value("RECOMMENDATION_BASE_URL"),
            notify_timeout_secs: parse(&value, "NOTIFY_TIMEOUT_SECS")?
                .unwrap_or(defaults.notify_timeout_secs),
            habit_freeze_cost: match parse::<i64>(&value, "HABIT_FREEZE_COST")? {
                Some(cost) if cost < 0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "HABIT_FREEZE_COST",
                        value: cost.to_string(),
                    })
                }
                Some(cost) => cost,
                None => defaults.habit_freeze_cost,
            },
        })
    }
}

fn parse<T: FromStr>(
    value: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    value(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        })
        .transpose()
}

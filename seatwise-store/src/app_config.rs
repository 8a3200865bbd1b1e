use serde::Deserialize;
use std::env;
use std::time::Duration;

use seatwise_core::{Materialization, SystemClock};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Rate limiting is off when this section is absent.
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: i64,
}

fn default_requests_per_minute() -> i64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    #[serde(default)]
    pub materialization: Materialization,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            materialization: Materialization::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl InventoryConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Offset of the operator's local time from UTC. Schedules are stored in it.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClockConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ClockConfig {
    pub fn system_clock(&self) -> Result<SystemClock, config::ConfigError> {
        SystemClock::from_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            config::ConfigError::Message(format!(
                "clock.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // SEATWISE__DATABASE__URL=... sets database.url
            .add_source(config::Environment::with_prefix("SEATWISE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

//! Coordinator configuration

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use locky_common::Result;

/// Margin kept between the heartbeat and the lock TTL
pub const HEARTBEAT_MARGIN: Duration = Duration::from_millis(100);

/// Configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Create a new configuration from a Config instance
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Load from an optional file, overridden by `LOCKY_*` environment variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let config = builder
            .add_source(Environment::with_prefix("locky").try_parsing(true))
            .build()?;

        Ok(Self { config })
    }

    /// Whether joining an unheld resource claims it (default: true)
    pub fn auto_lock(&self) -> bool {
        self.config.get_bool("auto_lock").unwrap_or(true)
    }

    /// Explicit heartbeat interval in milliseconds, if configured
    pub fn heartbeat_interval_ms(&self) -> Option<u64> {
        self.config
            .get_int("heartbeat_interval_ms")
            .ok()
            .map(|ms| ms.max(0) as u64)
    }
}

/// Options of a lock coordinator
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub auto_lock: bool,
    /// Defaults to the store TTL minus [`HEARTBEAT_MARGIN`]
    #[serde(rename = "heartbeat_interval_ms", with = "millis")]
    pub heartbeat_interval: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            auto_lock: true,
            heartbeat_interval: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            auto_lock: configuration.auto_lock(),
            heartbeat_interval: configuration
                .heartbeat_interval_ms()
                .map(Duration::from_millis),
        }
    }

    /// Heartbeat interval to use for the given TTL
    pub fn resolve_heartbeat_interval(&self, ttl: Duration) -> Duration {
        self.heartbeat_interval
            .unwrap_or_else(|| default_heartbeat_interval(ttl))
    }
}

/// Heartbeat that always lands inside the TTL window
pub fn default_heartbeat_interval(ttl: Duration) -> Duration {
    if ttl > HEARTBEAT_MARGIN {
        ttl - HEARTBEAT_MARGIN
    } else {
        (ttl / 2).max(Duration::from_millis(1))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

//! Logging initialisation for hosts embedding the coordinator.
//!
//! The coordinator itself only emits `tracing` events. Hosts that do not set up
//! their own subscriber can call [`init_logging`] once at startup.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set
    pub level: Level,
    /// Use ANSI colors
    pub ansi: bool,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            ansi: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        let level = std::env::var("LOCKY_LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::INFO);

        let ansi = std::env::var("LOCKY_LOG_ANSI")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        Self {
            level,
            ansi,
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install a global console subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_filter(config.filter());

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(level = %config.level, "Logging initialized");
    Ok(())
}

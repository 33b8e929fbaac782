//! Tracing setup for hosts embedding Kinex
//!
//! Library crates only emit `tracing` events. Binaries, test harnesses and
//! FFI hosts call [`init_tracing`] once to install a subscriber.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kinex_core::{KinexError, KinexResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub default_directive: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            format: LogFormat::Text,
            default_directive: "info".to_string(),
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Phase transitions and filter resets included
    pub fn verbose() -> Self {
        LoggingConfig {
            default_directive: "info,kinex_filter=debug,kinex_calibration=debug,kinex_rep=debug,kinex_safety=debug,kinex_runtime=debug".to_string(),
            with_target: true,
            ..Self::default()
        }
    }

    /// One JSON object per event, for log shippers
    pub fn json() -> Self {
        LoggingConfig {
            format: LogFormat::Json,
            ..Self::default()
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default directive.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> KinexResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_directive))
        .map_err(|e| KinexError::InvalidConfig(format!("log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };
    result.map_err(|e| KinexError::InvalidConfig(format!("tracing subscriber: {}", e)))
}

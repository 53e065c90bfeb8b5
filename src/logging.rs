//! Optional `tracing` subscriber setup for binaries and tests using the crate.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

/// Filter directives: `RUST_LOG` when set, otherwise the configured level
/// followed by the per-module overrides.
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    let mut directives = config.level.clone();
    for (module, level) in &config.modules {
        directives.push(',');
        directives.push_str(module);
        directives.push('=');
        directives.push_str(level);
    }
    EnvFilter::try_new(&directives).map_err(|e| ConfigError::LogFilter(format!("'{directives}': {e}")))
}

/// Installs a stderr subscriber. Fails when a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = filter(config)?;
    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ConfigError::LogFilter(e.to_string()))
}

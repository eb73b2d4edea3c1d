/*!
 * Logging and tracing initialization
 *
 * Events go to stderr in compact form, or to a JSON log file when one is
 * configured. `RUST_LOG` overrides the stderr filter; the file only ever
 * records the locator crates.
 */

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::LoggingConfig;
use crate::error::{LocatorError, Result};

/// Crates whose events pass the default filter
const LOG_TARGETS: [&str; 3] = ["hpp_locator", "hpp_locator_interface", "hpp_locator_connect"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Default filter directive enabling `level` for every locator crate
pub fn default_directive(level: Level) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Per-crate filter of the log file
fn file_targets(level: Level) -> Targets {
    Targets::new().with_targets(LOG_TARGETS.map(|target| (target, level)))
}

/// Install the process-wide subscriber described by `config`
///
/// # Errors
///
/// Returns `LocatorError::Config` if the log file cannot be created or a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    };

    let layer = match &config.log_file {
        Some(path) => file_layer(path, level)?,
        None => stderr_layer(level)?,
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LocatorError::Config(format!("Failed to install logger: {}", e)))
}

fn stderr_layer(level: Level) -> Result<BoxedLayer> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| LocatorError::Config(format!("Failed to create log filter: {}", e)))?;

    Ok(fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .with_filter(filter)
        .boxed())
}

fn file_layer(path: &Path, level: Level) -> Result<BoxedLayer> {
    let file = File::create(path).map_err(|e| {
        LocatorError::Config(format!("Failed to create log file {}: {}", path.display(), e))
    })?;

    Ok(fmt::layer()
        .json()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(false)
        .with_filter(file_targets(level))
        .boxed())
}

/// Route events of the locator crates to the test harness output
#[cfg(test)]
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(Level::DEBUG)));

    // Only the first caller in a test binary installs the subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_all_crates() {
        assert_eq!(
            default_directive(Level::WARN),
            "hpp_locator=WARN,hpp_locator_interface=WARN,hpp_locator_connect=WARN"
        );
        assert!(EnvFilter::try_new(default_directive(Level::DEBUG)).is_ok());
    }

    #[test]
    fn test_file_targets_keep_only_locator_crates() {
        let targets = file_targets(Level::INFO);

        assert!(targets.would_enable("hpp_locator_connect::channel", &Level::INFO));
        assert!(targets.would_enable("hpp_locator", &Level::WARN));
        assert!(!targets.would_enable("hpp_locator", &Level::DEBUG));
        assert!(!targets.would_enable("h2::codec", &Level::ERROR));
        assert!(!targets.would_enable("tonic::transport", &Level::INFO));
    }

    #[test]
    fn test_unwritable_log_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("locator.log");

        let result = file_layer(&path, Level::INFO);
        assert!(matches!(result, Err(LocatorError::Config(msg)) if msg.contains("locator.log")));
    }

    #[test]
    fn test_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::debug!("test logging initialized");
    }
}

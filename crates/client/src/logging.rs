//! Tracing setup: stderr plus an optional daily log file.
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::KioskConfig;

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. The returned
/// guard flushes the file writer and must be held until exit.
pub fn setup_logging(config: &KioskConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = if config.log_to_file {
        let log_dir = config.log_dir();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "kiosk.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_file)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if config.log_to_file {
        tracing::info!("Log file: {}/kiosk.log", config.log_dir().display());
    }

    Ok(guard)
}

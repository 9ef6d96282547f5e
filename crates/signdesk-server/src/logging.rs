//! Tracing setup: stdout always, plus a daily-rolling file when a log
//! directory is configured.

use std::path::Path;

use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "signdesk.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. The returned guard flushes the
/// file writer on drop and must be held for the life of the process.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    Ok(Some(guard))
}

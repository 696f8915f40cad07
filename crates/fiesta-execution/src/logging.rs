//! Global tracing subscriber setup.

use crate::tracing_layer::{TurnEvent, TurnEventLayer};
use fiesta_core::config::LoggingConfig;
use fiesta_core::{FiestaError, Result};
use std::path::Path;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "fiesta.log";

/// Keeps the background log writer alive; flushes on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. With file logging on,
/// output goes to a daily rolling file in `logs_dir`; otherwise to stderr.
/// When `events` is given, `fiesta*` events are also forwarded there.
pub fn init_tracing(
    config: &LoggingConfig,
    logs_dir: Option<&Path>,
    events: Option<mpsc::UnboundedSender<TurnEvent>>,
) -> Result<LogGuard> {
    let filter = build_filter(config, std::env::var("RUST_LOG").ok());

    let (file_layer, guard) = match logs_dir.filter(|_| config.file) {
        Some(dir) => {
            let (writer, guard) = file_writer(dir)?;
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().without_time().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .with(events.map(TurnEventLayer::new))
        .try_init()
        .map_err(|e| FiestaError::config(format!("Failed to install tracing subscriber: {e}")))?;

    Ok(LogGuard { _file: guard })
}

fn build_filter(config: &LoggingConfig, env: Option<String>) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(&config.filter).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

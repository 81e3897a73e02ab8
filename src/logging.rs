//! Logging initialization with file output support

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::paths;

/// Initialize logging to the console and to the application's log directory.
/// Falls back to console-only output when the directory cannot be created.
pub fn init_default_logging() -> Option<WorkerGuard> {
    match paths::ensure_log_dir() {
        Ok(dir) => init_logging(Some(dir)),
        Err(e) => {
            let guard = init_logging(None);
            tracing::warn!("File logging disabled: {}", e);
            guard
        }
    }
}

/// Initialize logging with optional file output.
/// Returns a guard that must be kept alive for the duration of the program.
///
/// Calling this more than once is harmless: the second registry is
/// rejected and logging keeps going to the first.
pub fn init_logging(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let console_layer = fmt::layer().with_target(true).with_thread_ids(false);

    // A log directory that cannot be created degrades to console output
    let mut dir_error = None;
    let log_dir = log_dir.and_then(|dir| match paths::ensure_private_dir(&dir) {
        Ok(()) => Some(dir),
        Err(e) => {
            dir_error = Some(format!("{}: {}", dir.display(), e));
            None
        }
    });

    let guard = match log_dir {
        Some(dir) => {
            // Daily rotating log file
            let file_appender = tracing_appender::rolling::daily(&dir, "sshclient.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);

            if let Err(e) = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
            {
                tracing::debug!("Logging already initialized: {}", e);
            }

            Some(guard)
        }
        None => {
            if let Err(e) = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init()
            {
                tracing::debug!("Logging already initialized: {}", e);
            }
            None
        }
    };

    if let Some(err) = dir_error {
        tracing::warn!("Cannot create log directory {}", err);
    }

    guard
}

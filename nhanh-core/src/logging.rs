//! Per-client loggers.
//!
//! A [`Logger`] is a `tracing` subscriber built from [`LoggingConfig`] and
//! held as a [`Dispatch`] rather than installed globally, so several clients
//! (and the host application) can each log to their own sinks. Events emitted
//! while a client call runs are routed to that client's logger.
//!
//! Sinks:
//! - console: human-readable lines on stderr
//! - file: daily rolling files next to the configured path, keeping
//!   `rotation_days` files

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt};

use crate::config::{LogLevel, LoggingConfig};

/// Error building a logger's sinks.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open rolling log file: {message}")]
    Appender { message: String },
}

/// Where a logger writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Console,
    /// Rolling files in `dir` named `{prefix}.{date}.log`.
    File { dir: PathBuf, prefix: String },
}

/// A client-scoped `tracing` subscriber.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    level: LogLevel,
    sinks: Vec<LogSink>,
    // Flushes the file writer when the last clone is dropped.
    _guard: Option<Arc<WorkerGuard>>,
}

impl Logger {
    /// A logger that discards everything.
    pub fn noop() -> Self {
        Self {
            dispatch: Dispatch::none(),
            level: LogLevel::Error,
            sinks: Vec::new(),
            _guard: None,
        }
    }

    /// Build a logger, falling back to [`Logger::noop`] when a sink cannot be
    /// created. Never fails.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::try_from_config(config).unwrap_or_else(|e| {
            tracing::warn!("logging disabled: {}", e);
            Self::noop()
        })
    }

    /// Build a logger, reporting sink failures.
    pub fn try_from_config(config: &LoggingConfig) -> Result<Self, LoggerError> {
        if !config.enabled || (!config.to_console && !config.to_file) {
            return Ok(Self::noop());
        }

        let mut sinks = Vec::new();
        let mut guard = None;

        let console = config.to_console.then(|| {
            sinks.push(LogSink::Console);
            fmt::layer().with_writer(std::io::stderr).with_target(true)
        });

        let file = if config.to_file {
            let (dir, prefix) = split_log_path(config.file_path());
            std::fs::create_dir_all(&dir).map_err(|source| LoggerError::CreateDir {
                path: dir.clone(),
                source,
            })?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&prefix)
                .filename_suffix("log")
                .max_log_files(config.rotation_days.max(1) as usize)
                .build(&dir)
                .map_err(|e| LoggerError::Appender {
                    message: e.to_string(),
                })?;

            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard = Some(Arc::new(worker));
            sinks.push(LogSink::File { dir, prefix });
            Some(fmt::layer().with_ansi(false).with_writer(writer))
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(console)
            .with(file)
            .with(config.level.as_level_filter());

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            level: config.level,
            sinks,
            _guard: guard,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn sinks(&self) -> &[LogSink] {
        &self.sinks
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger as the current subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn debug(&self, message: &str) {
        self.in_scope(|| tracing::debug!(target: "nhanh", "{}", message));
    }

    pub fn info(&self, message: &str) {
        self.in_scope(|| tracing::info!(target: "nhanh", "{}", message));
    }

    pub fn warning(&self, message: &str) {
        self.in_scope(|| tracing::warn!(target: "nhanh", "{}", message));
    }

    pub fn error(&self, message: &str) {
        self.in_scope(|| tracing::error!(target: "nhanh", "{}", message));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("sinks", &self.sinks)
            .finish()
    }
}

/// Split `logs/nhanh.log` into (`logs`, `nhanh`).
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "nhanh".to_string());
    (dir, prefix)
}

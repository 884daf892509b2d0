//! Structured logging

use std::path::PathBuf;
use std::sync::Arc;

use minigpt_config::{expand_tilde, LoggingConfig};
use parking_lot::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::error::{ObservabilityError, Result};

type ReloadHandle = Handle<EnvFilter, Registry>;

const LOG_FILE_PREFIX: &str = "minigpt.log";

/// Owns the installed subscriber's reload handle and file writer guard.
///
/// Keep it alive for the lifetime of the process; dropping it flushes and
/// stops the background file writer.
pub struct LogManager {
    level: String,
    directives: Vec<String>,
    reload_handle: Arc<RwLock<ReloadHandle>>,
    _guard: Option<WorkerGuard>,
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("level", &self.level)
            .field("file_output", &self._guard.is_some())
            .finish()
    }
}

/// Install the global subscriber described by `config`
pub fn init_logging(config: &LoggingConfig) -> Result<LogManager> {
    LogManager::init(config)
}

/// Level plus per-module directives, e.g. `info,hyper=warn`
pub fn build_filter(level: &str, directives: &[String]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ObservabilityError::logging(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

impl LogManager {
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let level = config.level.as_str().to_string();
        let filter = build_filter(&level, &config.directives)?;
        let (filter, reload_handle) = reload::Layer::new(filter);

        let (writer, guard, ansi) = match config.dir.as_deref() {
            Some(dir) => {
                let dir = log_dir(dir)?;
                std::fs::create_dir_all(&dir)?;
                let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(writer), Some(guard), false)
            }
            None => (BoxMakeWriter::new(std::io::stdout), None, true),
        };

        let registry = tracing_subscriber::registry().with(filter);
        let installed = if config.json {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_line_number(true)
                .with_writer(writer)
                .with_ansi(false);
            registry.with(layer).try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(writer)
                .with_ansi(ansi);
            registry.with(layer).try_init()
        };
        installed.map_err(|e| ObservabilityError::logging(e.to_string()))?;

        tracing::info!(
            target: "minigpt_observability",
            "Logging initialized with level: {}",
            level
        );

        Ok(Self {
            level,
            directives: config.directives.clone(),
            reload_handle: Arc::new(RwLock::new(reload_handle)),
            _guard: guard,
        })
    }

    /// Replace the active level, keeping the configured directives
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = build_filter(level, &self.directives)?;

        self.reload_handle
            .write()
            .modify(|filter| *filter = new_filter)
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;

        self.level = level.to_string();
        tracing::info!(target: "minigpt_observability", "Log level updated to: {}", level);
        Ok(())
    }

    pub fn level(&self) -> &str {
        &self.level
    }
}

fn log_dir(dir: &str) -> Result<PathBuf> {
    expand_tilde(dir)
        .ok_or_else(|| ObservabilityError::logging("Could not find home directory"))
}

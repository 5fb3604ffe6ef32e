//! Logger setup.
//!
//! Routes the `log` macros to stdout and, optionally, a log file. Debug
//! builds log at Debug, release builds at Info, unless the config says
//! otherwise.

use log::LevelFilter;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

/// Level used when the config does not override it
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Resolve the configured level, falling back to the build default
pub fn resolve_level(config: &LoggingConfig) -> Result<LevelFilter, LoggingError> {
    match config.level.as_deref() {
        None => Ok(default_level()),
        Some(level) => {
            LevelFilter::from_str(level).map_err(|_| LoggingError::InvalidLevel(level.to_string()))
        }
    }
}

/// Install the global logger.
///
/// Can only succeed once per process.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<(), LoggingError> {
    let level = resolve_level(config)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if config.to_file {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", config.file_name));
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    crate::debug!("Logger ready at level {}", level);
    Ok(())
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;

//! Tracing subscriber setup: a console layer and a daily-rotating file
//! layer, each filtered independently per the `[Log]` configuration.

use std::path::Path;

use thiserror::Error;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use crate::config::LogConfig;

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("cannot create log directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("log subscriber already initialized")]
    AlreadyInitialized,
}

fn level_filter(level: Option<tracing::Level>) -> LevelFilter {
    match level {
        Some(l) => LevelFilter::from_level(l),
        None => LevelFilter::OFF,
    }
}

/// Build and install the global subscriber. Returns the file-appender
/// guard; it must be kept alive for the process lifetime or buffered log
/// lines are lost on exit.
pub fn init(config: &LogConfig) -> Result<tracing_appender::non_blocking::WorkerGuard, LogInitError> {
    std::fs::create_dir_all(&config.file_path).map_err(|source| LogInitError::CreateDir {
        path: config.file_path.clone(),
        source,
    })?;

    let file_appender = tracing_appender::rolling::daily(Path::new(&config.file_path), &config.file_root);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(BoxMakeWriter::new(non_blocking))
        .with_ansi(false)
        .with_filter(Targets::new().with_default(level_filter(config.file_level.as_tracing_level())));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(BoxMakeWriter::new(std::io::stdout))
        .with_filter(Targets::new().with_default(level_filter(config.display_level.as_tracing_level())));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|_| LogInitError::AlreadyInitialized)?;

    Ok(guard)
}

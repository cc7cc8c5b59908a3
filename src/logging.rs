//! tracing subscriber setup for the binary

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::RegistryError;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Emit one JSON object per event
    pub json: bool,
    /// Append to this file instead of writing to stderr
    pub file: Option<PathBuf>,
    /// Overrides [`DEFAULT_FILTER`]; `RUST_LOG` still wins
    pub filter: Option<String>,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for as long as logging is needed.
pub fn init_logging(options: &LogOptions) -> Result<Option<WorkerGuard>, RegistryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(options.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });

    let (writer, guard) = match &options.file {
        Some(path) => {
            let (dir, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir).map_err(|e| {
                RegistryError::Config(format!("failed to create log directory {}: {}", dir.display(), e))
            })?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let layer = if options.json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_ansi(options.file.is_none())
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| RegistryError::Config(format!("failed to initialise logging: {}", e)))?;

    Ok(guard)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), RegistryError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RegistryError::Config(format!("log file has no file name: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(file_name)))
}

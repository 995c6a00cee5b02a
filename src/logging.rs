//! Tracing subscriber setup

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "rebalancer.log";

/// Full logging: console on stderr plus an optional daily rotating file.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,rebalancer={}", cfg.level)));

    let file_layer = cfg.dir.as_deref().and_then(file_writer).map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });
    let file_logging_enabled = file_layer.is_some();

    // stdout carries command output, so the console layer writes to stderr
    let json_layer = cfg.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let plain_layer = (!cfg.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init();

    if file_logging_enabled {
        tracing::info!(dir = ?cfg.dir, "file logging enabled");
    }
}

/// Minimal logging for one-shot CLI commands
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

// `rolling::daily` panics when it cannot create the first file, so check
// the directory is writable before handing it over.
fn file_writer(dir: &str) -> Option<tracing_appender::non_blocking::NonBlocking> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Warning: could not create log directory {dir} ({e}), file logging disabled");
        return None;
    }

    let probe = Path::new(dir).join(".rebalancer_write_test");
    if let Err(e) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        eprintln!("Warning: could not write to log directory {dir} ({e}), file logging disabled");
        return None;
    }
    let _ = std::fs::remove_file(&probe);

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Process-lifetime guard; dropping it stops the background writer
    Box::leak(Box::new(guard));
    Some(writer)
}

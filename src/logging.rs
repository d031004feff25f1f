//! Structured JSONL logging plus human-readable stderr output.
//!
//! This module provides dual-output logging:
//! - **JSONL to file** (`<cache root>/logs/clipindex.jsonl`) - structured, one object per line
//! - **Compact to stderr** - human-readable for developers
//!
//! stdout is never written by the logger; the interactive path prints its
//! results there.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipindex::logging;
//!
//! // MUST keep guard alive for duration of program
//! let _guard = logging::init(&config);
//!
//! tracing::info!(event_type = "index_run", "Indexer started");
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::IndexerConfig;

const LOG_FILE_NAME: &str = "clipindex.jsonl";

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the program.
/// Calling this twice keeps the first subscriber.
pub fn init(config: &IndexerConfig) -> LoggingGuard {
    let log_dir = config.log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_path(config);

    // Create non-blocking writer for file so the interactive path never waits on disk
    let (non_blocking_file, file_guard) = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            tracing_appender::non_blocking(std::io::sink())
        }
    };

    // Environment filter - default to info, allow override via RUST_LOG
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    let initialized = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if initialized {
        tracing::debug!(
            event_type = "app_lifecycle",
            action = "started",
            pid = std::process::id(),
            log_path = %log_path.display(),
            "Logging initialized"
        );
    }

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the path to the JSONL log file
pub fn log_path(config: &IndexerConfig) -> PathBuf {
    config.log_dir().join(LOG_FILE_NAME)
}

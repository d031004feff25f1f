use thiserror::Error;
use tracing::warn;

use crate::external::ToolError;

/// Domain errors for the enrichment subsystem.
///
/// None of these are fatal: every caller handles them locally, either by
/// degrading (empty list, empty cache) or by skipping the current item.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Clipboard history source unavailable: {0}")]
    SourceUnavailable(#[source] ToolError),

    #[error("External call timed out: {0}")]
    ExternalCallTimeout(#[source] ToolError),

    #[error("Cache file '{path}' is corrupt: {source}")]
    CacheCorrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Another indexer (pid {pid}) holds the lock")]
    LockContended { pid: u32 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IndexError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Whether the failed item should be retried on a later run
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::ExternalCallTimeout(_) | Self::LockContended { .. }
        )
    }
}

impl From<ToolError> for IndexError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout { .. } => Self::ExternalCallTimeout(err),
            other => Self::SourceUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use clipindex::error::ResultExt;
///
/// // Skip this entry and keep going
/// let bytes = decoder.decode(line).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

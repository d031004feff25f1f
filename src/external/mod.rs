//! External collaborators
//!
//! Every tool the indexer drives (history listing, image decode, resize, OCR,
//! notifications, clipboard writes) sits behind a narrow trait so the
//! coordinator can run against fakes in tests. The real implementations shell
//! out through [`command::run_with_timeout`], which bounds every call.
//!
//! ## Module Structure
//! - `command`: bounded-timeout subprocess runner
//! - `cliphist`: history listing, decode, delete, wipe
//! - `tesseract`: OCR and language discovery
//! - `magick`: thumbnail downscaling
//! - `desktop`: notifications and clipboard writes

mod cliphist;
pub mod command;
mod desktop;
mod magick;
mod tesseract;

use std::time::Duration;
use thiserror::Error;

use crate::clipboard_history::Entry;
use crate::config::IndexerConfig;

pub use cliphist::Cliphist;
pub use desktop::{NotifySend, WlCopy};
pub use magick::{sniff_format, ImageFormat, Magick};
pub use tesseract::Tesseract;

/// Failure of a single external call
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{program}' is not installed")]
    NotFound { program: String },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }
}

/// Ordered listing of the current clipboard history, newest first
pub trait HistorySource {
    fn list(&self) -> Result<Vec<Entry>, ToolError>;
    fn delete(&self, raw_line: &str) -> Result<(), ToolError>;
    fn wipe(&self) -> Result<(), ToolError>;
}

/// Raw entry line -> original bytes
pub trait Decoder {
    fn decode(&self, raw_line: &str) -> Result<Vec<u8>, ToolError>;
}

/// Downscale to fit a `max_edge` square, keeping aspect ratio and format
pub trait Resizer {
    fn resize(&self, bytes: &[u8], max_edge: u32) -> Result<Vec<u8>, ToolError>;
}

pub trait OcrEngine {
    /// Installed language packs
    fn languages(&self) -> Result<Vec<String>, ToolError>;
    /// Extract text with a `+`-joined language list. Empty text is a success.
    fn recognize(&self, bytes: &[u8], languages: &str) -> Result<String, ToolError>;
}

/// Fire-and-forget desktop notification; failures are swallowed
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

pub trait ClipboardSink {
    fn copy(&self, bytes: &[u8]) -> Result<(), ToolError>;
}

/// The full set of collaborators one process works with
pub struct Toolbox {
    pub history: Box<dyn HistorySource>,
    pub decoder: Box<dyn Decoder>,
    pub resizer: Box<dyn Resizer>,
    pub ocr: Box<dyn OcrEngine>,
    pub notifier: Box<dyn Notifier>,
    pub clipboard: Box<dyn ClipboardSink>,
}

impl Toolbox {
    /// Real tools, configured from `config`
    pub fn system(config: &IndexerConfig) -> Self {
        let cliphist = Cliphist::new(config);
        Toolbox {
            history: Box::new(cliphist.clone()),
            decoder: Box::new(cliphist),
            resizer: Box::new(Magick::new(config)),
            ocr: Box::new(Tesseract::new(config)),
            notifier: Box::new(NotifySend::new(config)),
            clipboard: Box::new(WlCopy::new(config)),
        }
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox").finish_non_exhaustive()
    }
}

//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Directory name under the XDG cache/config roots
pub const APP_DIR_NAME: &str = "clipindex";

/// File names under the cache root
pub const OCR_INDEX_FILE_NAME: &str = "ocr-index.json";
pub const LOCK_FILE_NAME: &str = "ocr-indexer.lock";
pub const LOG_DIR_NAME: &str = "logs";

/// Only the most recent N qualifying images are OCR'd per run
pub const DEFAULT_MAX_OCR_IMAGES: usize = 20;

/// Images smaller than this are not worth OCR (icons, avatars)
pub const DEFAULT_MIN_OCR_WIDTH: u32 = 100;
pub const DEFAULT_MIN_OCR_HEIGHT: u32 = 50;

/// Max thumbnail dimension (either edge)
pub const DEFAULT_MAX_THUMBNAIL_SIZE: u32 = 256;

/// Tesseract page segmentation mode (3 = fully automatic)
pub const DEFAULT_OCR_PSM: u32 = 3;

/// Fallback OCR language when the installed packs cannot be listed
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Fuzzy matching: max characters skipped between two matched query characters
pub const DEFAULT_TEXT_MAX_GAP: usize = 5;
pub const DEFAULT_OCR_MAX_GAP: usize = 12;

/// Display truncation (characters)
pub const DEFAULT_TEXT_DISPLAY_LEN: usize = 100;
pub const DEFAULT_OCR_PREVIEW_LEN: usize = 60;

/// External call timeouts (milliseconds)
pub const DEFAULT_LIST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RESIZE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_OCR_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_LANGUAGES_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 5_000;

/// External programs
pub const DEFAULT_CLIPHIST_COMMAND: &str = "cliphist";
pub const DEFAULT_TESSERACT_COMMAND: &str = "tesseract";
pub const DEFAULT_MAGICK_COMMAND: &str = "magick";
pub const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";
pub const DEFAULT_COPY_COMMAND: &str = "wl-copy";

/// Desktop notifications
pub const DEFAULT_NOTIFY_TITLE: &str = "Clipboard";
pub const DEFAULT_NOTIFY_APP_NAME: &str = "clipindex";
pub const DEFAULT_NOTIFY_DISPLAY_MS: u64 = 2_000;

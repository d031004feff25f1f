//! Configuration type definitions
//!
//! This module contains all the struct definitions for configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::*;

// ============================================
// INDEXER CONFIG
// ============================================

/// Top-level configuration passed explicitly into the coordinator, the stores
/// and the interactive path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerConfig {
    /// Directory holding the OCR index, the lock file and thumbnails
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    /// Only the N most recent qualifying images are submitted for OCR
    #[serde(default = "default_max_ocr_images")]
    pub max_ocr_images: usize,
    /// Minimum image width for OCR
    #[serde(default = "default_min_ocr_width")]
    pub min_ocr_width: u32,
    /// Minimum image height for OCR
    #[serde(default = "default_min_ocr_height")]
    pub min_ocr_height: u32,
    /// Images with an edge above this are downscaled for the thumbnail
    #[serde(default = "default_max_thumbnail_size")]
    pub max_thumbnail_size: u32,
    /// Tesseract page segmentation mode
    #[serde(default = "default_ocr_psm")]
    pub ocr_psm: u32,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

pub(crate) fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}
fn default_max_ocr_images() -> usize {
    DEFAULT_MAX_OCR_IMAGES
}
fn default_min_ocr_width() -> u32 {
    DEFAULT_MIN_OCR_WIDTH
}
fn default_min_ocr_height() -> u32 {
    DEFAULT_MIN_OCR_HEIGHT
}
fn default_max_thumbnail_size() -> u32 {
    DEFAULT_MAX_THUMBNAIL_SIZE
}
fn default_ocr_psm() -> u32 {
    DEFAULT_OCR_PSM
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            cache_root: default_cache_root(),
            max_ocr_images: DEFAULT_MAX_OCR_IMAGES,
            min_ocr_width: DEFAULT_MIN_OCR_WIDTH,
            min_ocr_height: DEFAULT_MIN_OCR_HEIGHT,
            max_thumbnail_size: DEFAULT_MAX_THUMBNAIL_SIZE,
            ocr_psm: DEFAULT_OCR_PSM,
            search: SearchConfig::default(),
            timeouts: TimeoutConfig::default(),
            commands: CommandConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Default config rooted at an explicit cache directory
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        IndexerConfig {
            cache_root: cache_root.into(),
            ..Default::default()
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Path to the hash -> OCR state mapping
    pub fn ocr_index_path(&self) -> PathBuf {
        self.cache_root.join(OCR_INDEX_FILE_NAME)
    }

    /// Path to the single-flight lock file
    pub fn lock_path(&self) -> PathBuf {
        self.cache_root.join(LOCK_FILE_NAME)
    }

    /// Thumbnails live directly under the cache root
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.cache_root.clone()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.cache_root.join(LOG_DIR_NAME)
    }

    /// Whether an image of this size qualifies for OCR
    pub fn is_worth_ocr(&self, width: u32, height: u32) -> bool {
        width >= self.min_ocr_width && height >= self.min_ocr_height
    }
}

// ============================================
// SEARCH CONFIG
// ============================================

/// Matching and rendering knobs for the interactive path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Max characters skipped between consecutively matched query characters
    #[serde(default = "default_text_max_gap")]
    pub text_max_gap: usize,
    /// Same bound applied to cached OCR text (looser, OCR output is noisy)
    #[serde(default = "default_ocr_max_gap")]
    pub ocr_max_gap: usize,
    /// Text entries longer than this are truncated with "..."
    #[serde(default = "default_text_display_len")]
    pub text_display_len: usize,
    /// OCR snippets in image descriptions are truncated to this length
    #[serde(default = "default_ocr_preview_len")]
    pub ocr_preview_len: usize,
}

fn default_text_max_gap() -> usize {
    DEFAULT_TEXT_MAX_GAP
}
fn default_ocr_max_gap() -> usize {
    DEFAULT_OCR_MAX_GAP
}
fn default_text_display_len() -> usize {
    DEFAULT_TEXT_DISPLAY_LEN
}
fn default_ocr_preview_len() -> usize {
    DEFAULT_OCR_PREVIEW_LEN
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            text_max_gap: DEFAULT_TEXT_MAX_GAP,
            ocr_max_gap: DEFAULT_OCR_MAX_GAP,
            text_display_len: DEFAULT_TEXT_DISPLAY_LEN,
            ocr_preview_len: DEFAULT_OCR_PREVIEW_LEN,
        }
    }
}

// ============================================
// TIMEOUTS
// ============================================

/// Upper bounds for every external call, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    #[serde(default = "default_list_timeout_ms")]
    pub list_ms: u64,
    #[serde(default = "default_decode_timeout_ms")]
    pub decode_ms: u64,
    #[serde(default = "default_resize_timeout_ms")]
    pub resize_ms: u64,
    #[serde(default = "default_ocr_timeout_ms")]
    pub ocr_ms: u64,
    #[serde(default = "default_languages_timeout_ms")]
    pub languages_ms: u64,
    #[serde(default = "default_notify_timeout_ms")]
    pub notify_ms: u64,
}

fn default_list_timeout_ms() -> u64 {
    DEFAULT_LIST_TIMEOUT_MS
}
fn default_decode_timeout_ms() -> u64 {
    DEFAULT_DECODE_TIMEOUT_MS
}
fn default_resize_timeout_ms() -> u64 {
    DEFAULT_RESIZE_TIMEOUT_MS
}
fn default_ocr_timeout_ms() -> u64 {
    DEFAULT_OCR_TIMEOUT_MS
}
fn default_languages_timeout_ms() -> u64 {
    DEFAULT_LANGUAGES_TIMEOUT_MS
}
fn default_notify_timeout_ms() -> u64 {
    DEFAULT_NOTIFY_TIMEOUT_MS
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            list_ms: DEFAULT_LIST_TIMEOUT_MS,
            decode_ms: DEFAULT_DECODE_TIMEOUT_MS,
            resize_ms: DEFAULT_RESIZE_TIMEOUT_MS,
            ocr_ms: DEFAULT_OCR_TIMEOUT_MS,
            languages_ms: DEFAULT_LANGUAGES_TIMEOUT_MS,
            notify_ms: DEFAULT_NOTIFY_TIMEOUT_MS,
        }
    }
}

impl TimeoutConfig {
    pub fn list(&self) -> Duration {
        Duration::from_millis(self.list_ms)
    }
    pub fn decode(&self) -> Duration {
        Duration::from_millis(self.decode_ms)
    }
    pub fn resize(&self) -> Duration {
        Duration::from_millis(self.resize_ms)
    }
    pub fn ocr(&self) -> Duration {
        Duration::from_millis(self.ocr_ms)
    }
    pub fn languages(&self) -> Duration {
        Duration::from_millis(self.languages_ms)
    }
    pub fn notify(&self) -> Duration {
        Duration::from_millis(self.notify_ms)
    }
}

// ============================================
// EXTERNAL COMMANDS
// ============================================

/// Program names (or absolute paths) of the external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    #[serde(default = "default_cliphist")]
    pub cliphist: String,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    #[serde(default = "default_magick")]
    pub magick: String,
    #[serde(default = "default_notify_send")]
    pub notify_send: String,
    #[serde(default = "default_copy")]
    pub copy: String,
}

fn default_cliphist() -> String {
    DEFAULT_CLIPHIST_COMMAND.to_string()
}
fn default_tesseract() -> String {
    DEFAULT_TESSERACT_COMMAND.to_string()
}
fn default_magick() -> String {
    DEFAULT_MAGICK_COMMAND.to_string()
}
fn default_notify_send() -> String {
    DEFAULT_NOTIFY_COMMAND.to_string()
}
fn default_copy() -> String {
    DEFAULT_COPY_COMMAND.to_string()
}

impl Default for CommandConfig {
    fn default() -> Self {
        CommandConfig {
            cliphist: default_cliphist(),
            tesseract: default_tesseract(),
            magick: default_magick(),
            notify_send: default_notify_send(),
            copy: default_copy(),
        }
    }
}

// ============================================
// NOTIFICATIONS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    /// Set to false to silence the "Indexing N images" notifications
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    #[serde(default = "default_notify_title")]
    pub title: String,
    #[serde(default = "default_notify_app_name")]
    pub app_name: String,
    /// How long the notification stays on screen
    #[serde(default = "default_notify_display_ms")]
    pub display_ms: u64,
}

fn default_notify_enabled() -> bool {
    true
}
fn default_notify_title() -> String {
    DEFAULT_NOTIFY_TITLE.to_string()
}
fn default_notify_app_name() -> String {
    DEFAULT_NOTIFY_APP_NAME.to_string()
}
fn default_notify_display_ms() -> u64 {
    DEFAULT_NOTIFY_DISPLAY_MS
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            enabled: true,
            title: default_notify_title(),
            app_name: default_notify_app_name(),
            display_ms: DEFAULT_NOTIFY_DISPLAY_MS,
        }
    }
}

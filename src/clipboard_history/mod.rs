//! Clipboard History Module
//!
//! Typed view of the external clipboard history plus the two caches derived
//! from it.
//!
//! ## Module Structure
//! - `entry`: line parsing, entry kinds, content hashing
//! - `ocr_index`: persistent hash -> OCR state mapping
//! - `thumbnails`: one cached image file per content hash

mod entry;
mod ocr_index;
mod thumbnails;

pub use entry::{content_hash, parse, parse_listing, ContentHash, Entry, EntryKind};
pub use ocr_index::{OcrIndex, OcrState};
pub use thumbnails::ThumbnailStore;

//! Clipboard history entry classification
//!
//! Parses `cliphist list` lines ("<id>\t<content>") into typed entries and
//! derives the content hash used as the cache key everywhere.
//!
//! The id is renumbered by the history tool and is never part of the hash:
//! two entries with identical content share their OCR record and thumbnail.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

/// `[[ binary data 12 KiB png 1920x1080 ]]`
static IMAGE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[.*binary data.*\d+x\d+.*\]\]$").expect("Invalid image placeholder regex")
});

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").expect("Invalid dimensions regex"));

/// Hex chars kept from the SHA-256 digest (128 bits)
const HASH_LEN: usize = 32;

/// Entry kind, with pixel dimensions for images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    Image { width: u32, height: u32 },
}

/// One clipboard history item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Opaque id from the history tool (unstable across renumbering)
    pub source_id: String,
    pub kind: EntryKind,
    /// Everything after the id token
    pub content: String,
    /// The untouched listing line; decode/delete take this as input
    pub raw_line: String,
}

impl Entry {
    pub fn is_image(&self) -> bool {
        matches!(self.kind, EntryKind::Image { .. })
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.kind {
            EntryKind::Image { width, height } => Some((width, height)),
            EntryKind::Text => None,
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        content_hash(self)
    }
}

/// Deterministic digest of an entry's content, used as the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts only strings shaped like a hash this module produced
    /// (used when scanning thumbnail file names).
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| ContentHash(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse one listing line into an entry.
///
/// Returns None only for blank lines. Anything that isn't an image
/// placeholder is text.
pub fn parse(raw_line: &str) -> Option<Entry> {
    let line = raw_line.trim_end_matches(['\n', '\r']);
    let trimmed = line.trim_start();
    if trimmed.trim().is_empty() {
        return None;
    }

    let (source_id, content) = match trimmed.split_once(char::is_whitespace) {
        Some((id, rest)) => (id, rest.trim_start()),
        None => (trimmed, ""),
    };

    let kind = classify(content);

    Some(Entry {
        source_id: source_id.to_string(),
        kind,
        content: content.to_string(),
        raw_line: line.to_string(),
    })
}

/// Parse the full stdout of a history listing, newest first
pub fn parse_listing(listing: &str) -> Vec<Entry> {
    listing.lines().filter_map(parse).collect()
}

fn classify(content: &str) -> EntryKind {
    if !IMAGE_PLACEHOLDER.is_match(content) {
        return EntryKind::Text;
    }

    DIMENSIONS
        .captures(content)
        .and_then(|caps| {
            let width = caps.get(1)?.as_str().parse().ok()?;
            let height = caps.get(2)?.as_str().parse().ok()?;
            Some(EntryKind::Image { width, height })
        })
        .unwrap_or(EntryKind::Text)
}

/// Hash an entry from its content only.
///
/// Text is hashed from a whitespace-trimmed copy; images from their raw
/// placeholder descriptor. The kind is mixed in so a text entry that happens
/// to spell out a placeholder never collides with an image.
pub fn content_hash(entry: &Entry) -> ContentHash {
    let (tag, normalized) = match entry.kind {
        EntryKind::Text => ("text", entry.content.trim()),
        EntryKind::Image { .. } => ("image", entry.content.as_str()),
    };

    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(HASH_LEN);
    ContentHash(hex)
}

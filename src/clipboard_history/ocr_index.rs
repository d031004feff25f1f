//! Persistent OCR index: content hash -> OCR state
//!
//! Single writer (the indexer), many readers (every interactive invocation).
//! Saves go through an atomic rename so a reader never sees a partial file;
//! a missing or corrupt file loads as an empty index.
//!
//! File format (`ocr-index.json`):
//! ```json
//! {"version":1,"updatedAt":"2026-01-01T00:00:00Z","entries":{
//!   "<hash>":{"state":"processed_empty"},
//!   "<hash>":{"state":"processed_with_text","text":"..."}}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::entry::ContentHash;
use crate::error::{IndexError, Result};
use crate::utils::atomic_write;

const FORMAT_VERSION: u32 = 1;

/// OCR outcome for one content hash.
///
/// `NotProcessed` is never written to disk: it is what an absent key means.
/// Once an entry is `ProcessedEmpty` or `ProcessedWithText` it is not OCR'd again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum OcrState {
    NotProcessed,
    ProcessedEmpty,
    ProcessedWithText(String),
}

impl OcrState {
    /// State for a successful OCR run that produced `text`
    pub fn from_output(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            OcrState::ProcessedEmpty
        } else {
            OcrState::ProcessedWithText(text.to_string())
        }
    }

    pub fn is_processed(&self) -> bool {
        !matches!(self, OcrState::NotProcessed)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            OcrState::ProcessedWithText(text) => Some(text),
            _ => None,
        }
    }
}

/// Owned form for deserialization
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrIndexData {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: HashMap<ContentHash, OcrState>,
}

/// Borrowed form for serialization; BTreeMap keeps the file diff-stable
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OcrIndexDataRef<'a> {
    version: u32,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<&'a ContentHash, &'a OcrState>,
}

#[derive(Debug, Clone)]
pub struct OcrIndex {
    path: PathBuf,
    entries: HashMap<ContentHash, OcrState>,
    updated_at: Option<DateTime<Utc>>,
    dirty: bool,
}

impl OcrIndex {
    /// Empty index backed by `path` (nothing is read)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OcrIndex {
            path: path.into(),
            entries: HashMap::new(),
            updated_at: None,
            dirty: false,
        }
    }

    /// Load the index, treating a missing or corrupt file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR index unreadable, starting empty");
                Self::new(path)
            }
        }
    }

    /// Strict load: missing file is empty, anything else unreadable is an error
    #[instrument(name = "ocr_index_load")]
    pub fn try_load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "OCR index not found, starting fresh");
                return Ok(Self::new(path));
            }
            Err(e) => return Err(IndexError::io(path, e)),
        };

        let data: OcrIndexData =
            serde_json::from_str(&content).map_err(|source| IndexError::CacheCorrupt {
                path: path.display().to_string(),
                source,
            })?;

        if data.version > FORMAT_VERSION {
            warn!(version = data.version, "OCR index written by a newer version");
        }

        // NotProcessed on disk carries no information
        let entries: HashMap<_, _> = data
            .entries
            .into_iter()
            .filter(|(_, state)| state.is_processed())
            .collect();

        debug!(path = %path.display(), entry_count = entries.len(), "Loaded OCR index");

        Ok(OcrIndex {
            path: path.to_path_buf(),
            entries,
            updated_at: data.updated_at,
            dirty: false,
        })
    }

    /// Persist with atomic replace. No-op when nothing changed.
    #[instrument(name = "ocr_index_save", skip(self), fields(path = %self.path.display()))]
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("No OCR index changes to save");
            return Ok(());
        }

        let now = Utc::now();
        let json = serde_json::to_vec(&OcrIndexDataRef {
            version: FORMAT_VERSION,
            updated_at: now,
            entries: self.entries.iter().collect(),
        })?;

        atomic_write(&self.path, &json).map_err(|e| IndexError::io(&self.path, e))?;

        debug!(
            entry_count = self.entries.len(),
            bytes = json.len(),
            "Saved OCR index (atomic)"
        );

        self.updated_at = Some(now);
        self.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn state(&self, hash: &ContentHash) -> OcrState {
        self.entries
            .get(hash)
            .cloned()
            .unwrap_or(OcrState::NotProcessed)
    }

    pub fn is_processed(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Cached OCR text, if the entry was processed and text was found
    pub fn text(&self, hash: &ContentHash) -> Option<&str> {
        self.entries.get(hash).and_then(OcrState::text)
    }

    /// Record an OCR outcome. Recording `NotProcessed` forgets the hash.
    pub fn record(&mut self, hash: ContentHash, state: OcrState) {
        match state {
            OcrState::NotProcessed => {
                if self.entries.remove(&hash).is_some() {
                    self.dirty = true;
                }
            }
            state => {
                if self.entries.get(&hash) != Some(&state) {
                    self.entries.insert(hash, state);
                    self.dirty = true;
                }
            }
        }
    }

    /// Drop records whose hash is no longer among the live entries.
    /// Returns the number of records removed.
    pub fn prune(&mut self, live: &HashSet<ContentHash>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|hash, _| live.contains(hash));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
            info!(removed, remaining = self.entries.len(), "Pruned OCR index");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

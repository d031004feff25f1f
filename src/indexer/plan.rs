//! Incremental work set for one indexer run
//!
//! Compares the current history against both caches and decides what is
//! left to do. Pure: no I/O beyond what the caller already loaded.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::clipboard_history::{ContentHash, Entry, OcrIndex};
use crate::config::IndexerConfig;

/// An image entry scheduled for work, with its cache key
#[derive(Debug, Clone)]
pub struct Candidate {
    pub hash: ContentHash,
    pub entry: Entry,
}

#[derive(Debug, Default)]
pub struct WorkPlan {
    /// Hash of every entry currently in history; anything else is pruned
    pub live: HashSet<ContentHash>,
    /// Images without a cached thumbnail
    pub thumbnails: Vec<Candidate>,
    /// Unprocessed images among the most recent OCR-worthy ones
    pub ocr: Vec<Candidate>,
}

impl WorkPlan {
    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty() && self.ocr.is_empty()
    }
}

/// Build the plan from `entries` (newest first).
///
/// The OCR window is the `max_ocr_images` most recent distinct images large
/// enough to be worth reading; only those still unprocessed are scheduled.
/// Older images never enter the window, which caps OCR cost per run no
/// matter how long the history is. Entries sharing content are planned once.
pub fn compute(
    entries: &[Entry],
    ocr_index: &OcrIndex,
    thumbnails: &HashMap<ContentHash, PathBuf>,
    config: &IndexerConfig,
) -> WorkPlan {
    let mut plan = WorkPlan::default();
    let mut ocr_window = 0usize;

    for entry in entries {
        let hash = entry.content_hash();
        if !plan.live.insert(hash.clone()) {
            continue;
        }

        let Some((width, height)) = entry.dimensions() else {
            continue;
        };

        if !thumbnails.contains_key(&hash) {
            plan.thumbnails.push(Candidate {
                hash: hash.clone(),
                entry: entry.clone(),
            });
        }

        if ocr_window < config.max_ocr_images && config.is_worth_ocr(width, height) {
            ocr_window += 1;
            if !ocr_index.is_processed(&hash) {
                plan.ocr.push(Candidate {
                    hash,
                    entry: entry.clone(),
                });
            }
        }
    }

    plan
}

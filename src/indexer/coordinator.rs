//! Single-flight background indexer
//!
//! One run walks: acquire lock -> scan history -> plan -> prune caches ->
//! thumbnails -> OCR -> release lock. Another live indexer turns the run into
//! a no-op. The lock guard is released on every exit path, and the OCR index
//! is saved after each recognized image so a killed run keeps its progress.

use serde::Serialize;
use std::fs;
use tracing::{debug, info, instrument, warn};

use super::plan::{self, Candidate};
use crate::clipboard_history::{OcrIndex, OcrState, ThumbnailStore};
use crate::config::{IndexerConfig, DEFAULT_OCR_LANGUAGE};
use crate::error::{IndexError, Result, ResultExt};
use crate::external::Toolbox;
use crate::lock::IndexLock;

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    /// Another indexer held the lock; nothing was touched
    pub aborted: bool,
    pub entries: usize,
    pub pruned_ocr: usize,
    pub pruned_thumbnails: usize,
    pub thumbnails_written: usize,
    pub thumbnails_failed: usize,
    /// Images whose OCR state is now recorded (with or without text)
    pub ocr_processed: usize,
    /// Subset of `ocr_processed` that produced no text
    pub ocr_empty: usize,
    /// OCR attempts that failed or timed out; retried on a later run
    pub ocr_deferred: usize,
}

impl IndexReport {
    fn aborted() -> Self {
        IndexReport {
            aborted: true,
            ..Default::default()
        }
    }
}

pub struct IndexCoordinator {
    config: IndexerConfig,
    tools: Toolbox,
}

impl IndexCoordinator {
    pub fn new(config: IndexerConfig, tools: Toolbox) -> Self {
        IndexCoordinator { config, tools }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run once. `LockContended` is not an error: it yields an aborted report.
    ///
    /// A history listing failure ends the run before anything is pruned, so
    /// a transient tool problem never empties the caches.
    #[instrument(name = "index_run", skip(self), fields(cache_root = %self.config.cache_root().display()))]
    pub fn run(&self) -> Result<IndexReport> {
        let cache_root = self.config.cache_root();
        fs::create_dir_all(cache_root).map_err(|e| IndexError::io(cache_root, e))?;

        let lock = match IndexLock::acquire(&self.config.lock_path()) {
            Ok(lock) => lock,
            Err(IndexError::LockContended { pid }) => {
                info!(holder_pid = pid, "Another indexer is running, exiting");
                return Ok(IndexReport::aborted());
            }
            Err(e) => return Err(e),
        };
        debug!(pid = lock.pid(), path = %lock.path().display(), "Holding index lock");

        let entries = self.tools.history.list().map_err(IndexError::from)?;
        let mut report = IndexReport {
            entries: entries.len(),
            ..Default::default()
        };

        let mut ocr_index = OcrIndex::load(self.config.ocr_index_path());
        debug!(
            records = ocr_index.len(),
            last_saved = ?ocr_index.updated_at(),
            "Loaded OCR index"
        );
        let thumbnails = ThumbnailStore::new(self.config.thumbnail_dir());
        let plan = plan::compute(&entries, &ocr_index, &thumbnails.load(), &self.config);

        report.pruned_ocr = ocr_index.prune(&plan.live);
        report.pruned_thumbnails = thumbnails.prune(&plan.live);
        if ocr_index.is_dirty() {
            ocr_index.save().warn_on_err();
        }

        info!(
            entries = report.entries,
            thumbnails_needed = plan.thumbnails.len(),
            ocr_needed = plan.ocr.len(),
            "Computed index work"
        );

        if !plan.ocr.is_empty() {
            self.notify(&format!("Indexing {} images...", plan.ocr.len()));
        }

        self.enrich_thumbnails(&plan.thumbnails, &thumbnails, &mut report);

        if !plan.ocr.is_empty() {
            let languages = self.ocr_languages();
            self.enrich_ocr(&plan.ocr, &languages, &mut ocr_index, &mut report);
        }

        if report.ocr_processed > 0 {
            self.notify(&format!("Indexed {} images", report.ocr_processed));
        }

        lock.release();
        info!(?report, "Index run finished");
        Ok(report)
    }

    /// Decode every candidate and store it, downscaled when oversized.
    /// A failing entry is skipped; the others still get their thumbnail.
    #[instrument(skip_all, fields(count = candidates.len()))]
    fn enrich_thumbnails(
        &self,
        candidates: &[Candidate],
        store: &ThumbnailStore,
        report: &mut IndexReport,
    ) {
        let max_edge = self.config.max_thumbnail_size;

        for candidate in candidates {
            let bytes = match self.tools.decoder.decode(&candidate.entry.raw_line) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(hash = %candidate.hash, error = %e, "Decode failed, skipping thumbnail");
                    report.thumbnails_failed += 1;
                    continue;
                }
            };

            let oversized = candidate
                .entry
                .dimensions()
                .is_some_and(|(w, h)| w > max_edge || h > max_edge);

            let bytes = if oversized {
                match self.tools.resizer.resize(&bytes, max_edge) {
                    Ok(resized) => resized,
                    Err(e) => {
                        warn!(hash = %candidate.hash, error = %e, "Resize failed, storing original");
                        bytes
                    }
                }
            } else {
                bytes
            };

            match store.store(&candidate.hash, &bytes) {
                Ok(_) => report.thumbnails_written += 1,
                Err(e) => {
                    warn!(hash = %candidate.hash, error = %e, "Failed to store thumbnail");
                    report.thumbnails_failed += 1;
                }
            }
        }
    }

    /// OCR each candidate and persist after every recorded result.
    /// Failures and timeouts leave the entry unprocessed for a later run.
    #[instrument(skip_all, fields(count = candidates.len(), languages = %languages))]
    fn enrich_ocr(
        &self,
        candidates: &[Candidate],
        languages: &str,
        ocr_index: &mut OcrIndex,
        report: &mut IndexReport,
    ) {
        for candidate in candidates {
            let bytes = match self.tools.decoder.decode(&candidate.entry.raw_line) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(hash = %candidate.hash, error = %e, "Decode failed, deferring OCR");
                    report.ocr_deferred += 1;
                    continue;
                }
            };

            let text = match self.tools.ocr.recognize(&bytes, languages) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        hash = %candidate.hash,
                        timed_out = e.is_timeout(),
                        error = %e,
                        "OCR failed, deferring"
                    );
                    report.ocr_deferred += 1;
                    continue;
                }
            };

            let state = OcrState::from_output(&text);
            if state == OcrState::ProcessedEmpty {
                report.ocr_empty += 1;
            }
            debug!(hash = %candidate.hash, has_text = state.text().is_some(), "OCR complete");

            ocr_index.record(candidate.hash.clone(), state);
            ocr_index.save().warn_on_err();
            report.ocr_processed += 1;
        }
    }

    /// `+`-joined installed languages, `eng` when none can be found
    fn ocr_languages(&self) -> String {
        match self.tools.ocr.languages() {
            Ok(languages) if !languages.is_empty() => languages.join("+"),
            Ok(_) => DEFAULT_OCR_LANGUAGE.to_string(),
            Err(e) => {
                warn!(error = %e, "Language query failed, using default");
                DEFAULT_OCR_LANGUAGE.to_string()
            }
        }
    }

    fn notify(&self, body: &str) {
        self.tools.notifier.notify(&self.config.notify.title, body);
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

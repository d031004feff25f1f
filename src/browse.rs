//! Interactive path: one short-lived invocation per keystroke
//!
//! Lists the history, reads both caches as they are right now and answers
//! immediately. It never decodes, resizes or OCRs, and it never writes a
//! cache. Anything slow is handed to a detached indexer through
//! [`IndexScheduler`]; the two sides share nothing but the cache directory.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument, warn};

use crate::clipboard_history::{Entry, OcrIndex, ThumbnailStore};
use crate::config::IndexerConfig;
use crate::error::Result;
use crate::external::Toolbox;
use crate::lock;
use crate::search::{self, ResultItem, TypeFilter, EMPTY_RESULT_ID};

/// Asks for an indexer run without waiting for it
pub trait IndexScheduler {
    fn request(&self) -> io::Result<()>;
}

/// Re-executes the current binary as `clipindex [--config PATH] index`,
/// detached: null stdio, own process group, never waited on.
#[derive(Debug, Clone, Default)]
pub struct DetachedProcess {
    config_path: Option<PathBuf>,
}

impl DetachedProcess {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        DetachedProcess { config_path }
    }
}

impl IndexScheduler for DetachedProcess {
    fn request(&self) -> io::Result<()> {
        let exe = std::env::current_exe()?;
        let mut command = Command::new(exe);
        if let Some(path) = &self.config_path {
            command.arg("--config").arg(path);
        }
        command
            .arg("index")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Survives the terminal/launcher closing our group
            command.process_group(0);
        }

        let child = command.spawn()?;
        debug!(pid = child.id(), "Spawned background indexer");
        Ok(())
    }
}

/// Entries plus the cache state observed at one instant
#[derive(Debug)]
pub struct Snapshot {
    entries: Vec<Entry>,
    ocr_index: OcrIndex,
    thumbnails: ThumbnailStore,
}

impl Snapshot {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

pub struct Browser {
    config: IndexerConfig,
    tools: Toolbox,
    scheduler: Box<dyn IndexScheduler>,
}

impl Browser {
    pub fn new(
        config: IndexerConfig,
        tools: Toolbox,
        scheduler: Box<dyn IndexScheduler>,
    ) -> Self {
        Browser {
            config,
            tools,
            scheduler,
        }
    }

    /// Read current state. An unavailable history tool means an empty list.
    pub fn snapshot(&self) -> Snapshot {
        let entries = match self.tools.history.list() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Clipboard history unavailable, showing nothing");
                Vec::new()
            }
        };
        Snapshot {
            entries,
            ocr_index: OcrIndex::load(self.config.ocr_index_path()),
            thumbnails: ThumbnailStore::new(self.config.thumbnail_dir()),
        }
    }

    /// Filter and render against a fresh snapshot.
    ///
    /// `initial` marks the first display of the list, which also asks for a
    /// background index run.
    #[instrument(skip(self, filter), fields(filter = %filter))]
    pub fn list(&self, query: &str, filter: TypeFilter, initial: bool) -> Vec<ResultItem> {
        if initial {
            self.request_index();
        }
        let snapshot = self.snapshot();
        let results = search::search_entries(
            &snapshot.entries,
            query,
            filter,
            &snapshot.ocr_index,
            &snapshot.thumbnails,
            &self.config.search,
        );
        debug!(
            entries = snapshot.entries.len(),
            results = results.len(),
            "Answered query"
        );
        results
    }

    /// Ask for an indexer run unless one is already going
    pub fn request_index(&self) {
        if lock::is_held(&self.config.lock_path()) {
            debug!("Indexer already running, not spawning another");
            return;
        }
        if let Err(e) = self.scheduler.request() {
            warn!(error = %e, "Failed to request background index");
        }
    }

    /// Delete one entry. Its cache records go on the next index run.
    pub fn delete(&self, raw_line: &str) -> Result<()> {
        if raw_line == EMPTY_RESULT_ID {
            return Ok(());
        }
        self.tools.history.delete(raw_line)?;
        info!("Deleted clipboard entry");
        self.request_index();
        Ok(())
    }

    /// Clear the whole history. The index run that follows prunes every record.
    pub fn wipe(&self) -> Result<()> {
        self.tools.history.wipe()?;
        info!("Wiped clipboard history");
        self.request_index();
        Ok(())
    }

    /// Put an entry's original content back on the clipboard
    pub fn copy(&self, raw_line: &str) -> Result<()> {
        if raw_line == EMPTY_RESULT_ID {
            return Ok(());
        }
        let bytes = self.tools.decoder.decode(raw_line)?;
        self.tools.clipboard.copy(&bytes)?;
        debug!(bytes = bytes.len(), "Copied entry to clipboard");
        Ok(())
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }
}

/// `--config` value to hand to a detached indexer, if one was given
pub fn forwarded_config_path(path: Option<&Path>) -> Option<PathBuf> {
    path.map(|p| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf()))
}

//! File-based thumbnail storage for clipboard images
//!
//! One file per content hash: `<cache root>/<hash>.png`. The existence of the
//! file is the cache signal; there is no separate index. Writes go through
//! an atomic rename so a concurrent reader never picks up a half-written
//! image.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::entry::ContentHash;
use crate::error::{IndexError, Result};
use crate::lock::is_process_running;
use crate::utils::{atomic_write, temp_file_owner};

const THUMBNAIL_EXTENSION: &str = "png";

#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    dir: PathBuf,
}

impl ThumbnailStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ThumbnailStore { dir: dir.into() }
    }

    /// Where the thumbnail for `hash` lives (whether or not it exists yet)
    pub fn path_for(&self, hash: &ContentHash) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hash.as_str(), THUMBNAIL_EXTENSION))
    }

    /// Cached thumbnail path, only if the file exists
    pub fn lookup(&self, hash: &ContentHash) -> Option<PathBuf> {
        let path = self.path_for(hash);
        path.is_file().then_some(path)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.path_for(hash).is_file()
    }

    /// Scan the directory for all cached thumbnails.
    ///
    /// A missing directory is an empty store. Files that aren't named like a
    /// content hash are ignored.
    pub fn load(&self) -> HashMap<ContentHash, PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to read thumbnail directory");
                }
                return HashMap::new();
            }
        };

        entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path
                    .extension()
                    .is_some_and(|ext| ext == THUMBNAIL_EXTENSION)
                {
                    return None;
                }
                let hash = ContentHash::parse(path.file_stem()?.to_str()?)?;
                Some((hash, path))
            })
            .collect()
    }

    /// Store image bytes for `hash`, replacing any existing file
    pub fn store(&self, hash: &ContentHash, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(hash);
        atomic_write(&path, bytes).map_err(|e| IndexError::io(&path, e))?;
        debug!(hash = %hash, size = bytes.len(), "Stored thumbnail");
        Ok(path)
    }

    /// Delete the thumbnail for `hash`. Returns true if a file was removed.
    pub fn remove(&self, hash: &ContentHash) -> bool {
        let path = self.path_for(hash);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(hash = %hash, "Deleted thumbnail");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(hash = %hash, error = %e, "Failed to delete thumbnail");
                false
            }
        }
    }

    /// Remove thumbnails whose hash is not among the live entries, plus
    /// temp files left by writers that were killed mid-write.
    /// Returns the number of thumbnails deleted.
    pub fn prune(&self, live: &HashSet<ContentHash>) -> usize {
        self.sweep_abandoned_writes();

        let deleted = self
            .load()
            .into_keys()
            .filter(|hash| !live.contains(hash))
            .filter(|hash| self.remove(hash))
            .count();

        if deleted > 0 {
            info!(deleted, "Pruned orphaned thumbnails");
        }
        deleted
    }

    /// Delete `.<name>.<pid>.tmp` files whose writer is no longer running
    fn sweep_abandoned_writes(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };

        let swept = entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(temp_file_owner)
                    .is_some_and(|pid| !is_process_running(pid))
            })
            .filter(|entry| fs::remove_file(entry.path()).is_ok())
            .count();

        if swept > 0 {
            info!(swept, "Removed abandoned temp files");
        }
        swept
    }
}

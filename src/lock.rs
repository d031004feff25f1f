//! Single-flight lock for the background indexer
//!
//! The lock is a file holding the holder's decimal PID. It is *live* while
//! that process exists and *stale* otherwise; a stale lock is reclaimed by the
//! next acquirer. The lock file is removed when the guard drops, so every
//! exit path that unwinds releases it. A killed holder leaves a stale lock
//! that heals itself on the next run.
//!
//! The lock file appears atomically with its PID already written (hard link
//! from a temp file), so two indexers racing for an absent lock cannot both
//! win and nobody ever reads a half-written lock.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};

/// Attempts to create the lock before giving up; each retry follows a stale
/// lock being cleared (ours or a concurrent reclaimer's).
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// Held lock. Dropping it removes the lock file.
#[derive(Debug)]
pub struct IndexLock {
    path: PathBuf,
    pid: u32,
}

impl IndexLock {
    /// Try to become the single running indexer.
    ///
    /// Returns `IndexError::LockContended` if a live process holds the lock.
    pub fn acquire(path: &Path) -> Result<IndexLock> {
        let pid = std::process::id();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }

        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            if try_create(path, pid)? {
                debug!(pid, path = %path.display(), "Acquired indexer lock");
                return Ok(IndexLock {
                    path: path.to_path_buf(),
                    pid,
                });
            }

            let holder = read_holder(path);
            if let Some(live) = holder.filter(|&p| is_process_running(p)) {
                return Err(IndexError::LockContended { pid: live });
            }

            info!(stale_pid = ?holder, "Reclaiming stale indexer lock");
            reclaim_stale(path, pid, holder)?;
        }

        // Lost every race to other reclaimers: one of them is running
        let holder = read_holder(path).unwrap_or_default();
        Err(IndexError::LockContended { pid: holder })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly (same as dropping)
    pub fn release(self) {}
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        // Only remove the file if it still names us; a reclaimer may have
        // replaced it after we were presumed dead.
        if read_holder(&self.path) != Some(self.pid) {
            warn!(path = %self.path.display(), "Lock file no longer ours, leaving it");
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(pid = self.pid, "Released indexer lock"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to remove indexer lock"),
        }
    }
}

/// Create the lock file already holding `pid`.
///
/// The PID goes into a private temp file which is then hard-linked into
/// place; `hard_link` fails if the target exists, so the lock appears
/// atomically with its content. Returns false if the lock already exists.
fn try_create(path: &Path, pid: u32) -> Result<bool> {
    let temp_path = sibling(path, &format!("{}.tmp", pid));
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| IndexError::io(&temp_path, e))?;
    write!(file, "{}", pid).map_err(|e| IndexError::io(&temp_path, e))?;
    drop(file);

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(IndexError::io(path, e)),
    }
}

/// Move a stale lock aside and delete it.
///
/// If another reclaimer replaced the lock between our read and the move, we
/// have just grabbed its fresh lock: put it back and report contention.
fn reclaim_stale(path: &Path, pid: u32, stale: Option<u32>) -> Result<()> {
    let aside = sibling(path, &format!("stale.{}", pid));
    match fs::rename(path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(IndexError::io(path, e)),
    }

    let moved = read_holder(&aside);
    if moved != stale {
        if let Some(live) = moved.filter(|&p| is_process_running(p)) {
            restore(&aside, path, live);
            return Err(IndexError::LockContended { pid: live });
        }
    }

    let _ = fs::remove_file(&aside);
    Ok(())
}

/// Put a live holder's lock back from `aside`.
///
/// Returns false if it could not be linked back. When a third acquirer
/// already owns `path` that lock is left alone; any other failure keeps
/// `aside` on disk so the holder's PID isn't lost.
fn restore(aside: &Path, path: &Path, holder: u32) -> bool {
    match fs::hard_link(aside, path) {
        Ok(()) => {
            let _ = fs::remove_file(aside);
            true
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!(
                holder,
                current = ?read_holder(path),
                "Lock re-taken before it could be restored to its live holder"
            );
            let _ = fs::remove_file(aside);
            false
        }
        Err(e) => {
            warn!(
                holder,
                aside = %aside.display(),
                error = %e,
                "Failed to restore lock to its live holder"
            );
            false
        }
    }
}

/// `<lock file name>.<suffix>` in the same directory
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}", name, suffix))
}

/// PID named by the lock file, if it exists and parses
pub fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a live indexer currently holds the lock at `path`
pub fn is_held(path: &Path) -> bool {
    read_holder(path).is_some_and(is_process_running)
}

/// Check if a process is currently running
pub fn is_process_running(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

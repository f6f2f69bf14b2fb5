//! Snapshot request/complete handshake and snapshot files.
//!
//! A caller asks for a snapshot and blocks on a completion channel; the
//! autopilot loop, which holds the pixels, writes the files and resolves every
//! waiting request. A caller that times out just stops listening: the request
//! stays pending and the next tracked frame is still saved.

use crate::{constants::LATEST_SNAPSHOT_FILE, Error, Result};
use chrono::{DateTime, Local, SecondsFormat};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Files written for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    /// `<folder>/<RFC3339 timestamp>.jpg`
    pub archive: PathBuf,
    /// `<folder>/snapshot.jpg`
    pub latest: PathBuf,
}

/// What a snapshot request ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Both files were written
    Saved(SavedSnapshot),
    /// The loop took the frame but writing failed
    Failed(String),
    /// No frame was processed in time
    TimedOut,
}

type Completion = std::result::Result<SavedSnapshot, String>;

/// Pending flag plus the completion channels of everyone waiting on it
#[derive(Default)]
pub struct SnapshotSync {
    pending: AtomicBool,
    waiters: Mutex<Vec<Sender<Completion>>>,
}

/// A registered snapshot request
pub struct SnapshotTicket {
    completion: Receiver<Completion>,
}

impl SnapshotTicket {
    /// Block until the loop resolves this request or `timeout` elapses
    pub fn wait(self, timeout: Duration) -> SnapshotOutcome {
        match self.completion.recv_timeout(timeout) {
            Ok(Ok(saved)) => SnapshotOutcome::Saved(saved),
            Ok(Err(reason)) => SnapshotOutcome::Failed(reason),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => SnapshotOutcome::TimedOut,
        }
    }
}

impl SnapshotSync {
    /// Create with nothing pending
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a snapshot as pending and register for its completion
    pub fn request(&self) -> SnapshotTicket {
        let (tx, rx) = bounded(1);
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        waiters.push(tx);
        self.pending.store(true, Ordering::Release);
        SnapshotTicket { completion: rx }
    }

    /// Whether a frame should be saved
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve every waiter and clear the pending flag
    pub fn complete(&self, result: &Result<SavedSnapshot>) {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        self.pending.store(false, Ordering::Release);
        for waiter in waiters.drain(..) {
            let message = match result {
                Ok(saved) => Ok(saved.clone()),
                Err(e) => Err(e.to_string()),
            };
            // The caller may have timed out already.
            let _ = waiter.try_send(message);
        }
    }
}

/// Writes snapshot JPEGs into one folder
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    folder: PathBuf,
}

impl SnapshotStore {
    /// Store snapshots under `folder` (created on first save)
    pub fn new<P: Into<PathBuf>>(folder: P) -> Self {
        Self { folder: folder.into() }
    }

    /// Write `jpeg` to a timestamped file and to the fixed latest-snapshot file
    pub fn save(&self, jpeg: &[u8], taken_at: DateTime<Local>) -> Result<SavedSnapshot> {
        fs::create_dir_all(&self.folder).map_err(|e| {
            Error::Snapshot(format!("Cannot create {}: {e}", self.folder.display()))
        })?;

        let stamp = taken_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let archive = self.folder.join(format!("{stamp}.jpg"));
        let latest = self.folder.join(LATEST_SNAPSHOT_FILE);

        write_image(&archive, jpeg)?;
        write_image(&latest, jpeg)?;

        Ok(SavedSnapshot { archive, latest })
    }
}

fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    options
        .open(path)
        .and_then(|mut file| file.write_all(bytes))
        .map_err(|e| Error::Snapshot(format!("Cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    #[test]
    fn test_request_then_complete() {
        let sync = SnapshotSync::new();
        assert!(!sync.is_pending());

        let ticket = sync.request();
        assert!(sync.is_pending());

        let saved = SavedSnapshot {
            archive: PathBuf::from("a.jpg"),
            latest: PathBuf::from("snapshot.jpg"),
        };
        sync.complete(&Ok(saved.clone()));
        assert!(!sync.is_pending());
        assert_eq!(ticket.wait(Duration::from_millis(10)), SnapshotOutcome::Saved(saved));
    }

    #[test]
    fn test_timeout_leaves_request_pending() {
        let sync = SnapshotSync::new();
        let ticket = sync.request();
        assert_eq!(ticket.wait(Duration::from_millis(20)), SnapshotOutcome::TimedOut);
        assert!(sync.is_pending());

        // Completing after the caller left must not panic.
        sync.complete(&Ok(SavedSnapshot {
            archive: PathBuf::from("a.jpg"),
            latest: PathBuf::from("b.jpg"),
        }));
        assert!(!sync.is_pending());
    }

    #[test]
    fn test_failure_reaches_every_waiter() {
        let sync = SnapshotSync::new();
        let first = sync.request();
        let second = sync.request();
        sync.complete(&Err(Error::Snapshot("disk full".to_string())));

        for ticket in [first, second] {
            match ticket.wait(Duration::from_millis(10)) {
                SnapshotOutcome::Failed(reason) => assert!(reason.contains("disk full")),
                other => panic!("Expected Failed, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_waiter_unblocks_from_other_thread() {
        let sync = std::sync::Arc::new(SnapshotSync::new());
        let ticket = sync.request();
        let completer = std::sync::Arc::clone(&sync);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete(&Err(Error::Snapshot("late".to_string())));
        });
        assert!(matches!(ticket.wait(Duration::from_secs(5)), SnapshotOutcome::Failed(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_store_writes_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snaps"));
        let taken_at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let saved = store.save(&[0xFF, 0xD8, 1, 2, 3], taken_at).unwrap();
        assert_eq!(saved.latest, dir.path().join("snaps").join("snapshot.jpg"));
        assert!(saved
            .archive
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("2024-05-01T12:30:00"));

        let archive = fs::read(&saved.archive).unwrap();
        let latest = fs::read(&saved.latest).unwrap();
        assert_eq!(archive, latest);
        assert_eq!(latest, vec![0xFF, 0xD8, 1, 2, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let saved = store.save(&[1], Local::now()).unwrap();
        let mode = fs::metadata(&saved.latest).unwrap().permissions().mode() & 0o777;
        // umask can only remove bits
        assert_eq!(mode & !0o644, 0);
        assert_ne!(mode & 0o200, 0);
    }

    #[test]
    fn test_store_reports_unwritable_folder() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let store = SnapshotStore::new(blocker.join("snaps"));
        assert!(matches!(store.save(&[1], Local::now()), Err(Error::Snapshot(_))));
    }
}

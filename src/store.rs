//! Transient artifact store
//!
//! A single directory holds the output of every job, namespaced by the job
//! identifier as a filename prefix so all fragments of one job's output
//! (including intermediate extensions) are discoverable by prefix match and
//! concurrent jobs never collide. Entries live until they are delivered to a
//! client or until the age-based sweep reclaims them, whichever comes first;
//! the sweep guarantees no permanent disk leak even when the per-job cleanup
//! path never runs.

use crate::error::Result;
use crate::types::JobId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Extensions written by the fetch tool while a file is still in flight.
/// Verification must not mistake these for finished output.
const PARTIAL_EXTENSIONS: &[&str] = &["part", "ytdl"];

/// A finished (non-partial) file found in the store
#[derive(Clone, Debug)]
pub struct StoreEntry {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Lowercased extension, empty if the file has none
    pub extension: String,
}

/// Filesystem area for in-flight and completed artifacts
#[derive(Debug)]
pub struct TransientStore {
    root: PathBuf,
}

impl TransientStore {
    /// Open the store, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            crate::error::Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create transient store directory '{}': {}",
                    root.display(),
                    e
                ),
            ))
        })?;
        Ok(Self { root })
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output-path template handed to the fetch tool
    ///
    /// The `%(ext)s` placeholder is expanded by the tool itself; the job
    /// identifier prefix is what makes the result discoverable later.
    pub fn output_template(&self, id: &JobId) -> PathBuf {
        self.root.join(format!("{id}.%(ext)s"))
    }

    /// Find the job's finished output, excluding still-partial markers
    ///
    /// Returns the first match in lexicographic order so repeated scans of
    /// the same directory state agree on the winner.
    pub async fn find_output(&self, id: &JobId) -> Result<Option<StoreEntry>> {
        // Match "{id}." rather than the bare id: "1700-1" is a string prefix
        // of "1700-10.mp4" but not of that job's output
        let prefix = format!("{id}.");
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && !is_partial(name) {
                names.push(name.to_string());
            }
        }
        names.sort();

        let Some(name) = names.into_iter().next() else {
            return Ok(None);
        };
        let path = self.root.join(&name);
        let metadata = tokio::fs::metadata(&path).await?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        Ok(Some(StoreEntry {
            path,
            size_bytes: metadata.len(),
            extension,
        }))
    }

    /// Delete every file carrying the job's prefix, partial markers included
    ///
    /// Returns the number of files removed.
    pub async fn remove(&self, id: &JobId) -> Result<usize> {
        let prefix = format!("{id}.");
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove every file older than the retention window
    ///
    /// Files belonging to in-flight jobs are naturally younger than any sane
    /// retention window, so the sweep can run concurrently with active jobs.
    /// Returns the number of files removed; per-file errors are logged and
    /// skipped so one undeletable file cannot stall eviction.
    pub async fn sweep(&self, retention: Duration) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let age = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified.elapsed().unwrap_or(Duration::ZERO),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not stat store entry");
                    continue;
                }
            };
            if age <= retention {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Swept expired store entry");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not sweep store entry");
                }
            }
        }
        Ok(removed)
    }
}

fn is_partial(name: &str) -> bool {
    PARTIAL_EXTENSIONS
        .iter()
        .any(|ext| name.rsplit('.').next() == Some(*ext))
}

/// Spawn the periodic age-based sweeper
///
/// Ticks immediately on start (reclaiming leftovers from a previous run) and
/// then every `interval` until the token is cancelled.
pub fn spawn_sweeper(
    store: Arc<TransientStore>,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.sweep(retention).await {
                        Ok(0) => {}
                        Ok(removed) => {
                            tracing::info!(removed, "Transient store sweep reclaimed entries");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Transient store sweep failed");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Transient store sweeper stopped");
                    break;
                }
            }
        }
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (TransientStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = TransientStore::open(dir.path()).await.unwrap();
        (store, dir)
    }

    async fn write(store: &TransientStore, name: &str, contents: &[u8]) -> PathBuf {
        let path = store.root().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/temp");
        let store = TransientStore::open(&nested).await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn output_template_is_prefix_scoped() {
        let (store, _dir) = test_store().await;
        let id = JobId::from("1700-0");
        let template = store.output_template(&id);
        assert!(template.ends_with("1700-0.%(ext)s"), "got {template:?}");
    }

    #[tokio::test]
    async fn find_output_matches_by_prefix_only() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-0.mp4", b"video").await;
        write(&store, "1700-1.mp4", b"other job").await;

        let entry = store
            .find_output(&JobId::from("1700-0"))
            .await
            .unwrap()
            .unwrap();
        assert!(entry.path.ends_with("1700-0.mp4"));
        assert_eq!(entry.size_bytes, 5);
        assert_eq!(entry.extension, "mp4");
    }

    #[tokio::test]
    async fn find_output_does_not_match_ids_sharing_a_string_prefix() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-10.mp4", b"someone else's output").await;

        let found = store.find_output(&JobId::from("1700-1")).await.unwrap();
        assert!(
            found.is_none(),
            "job 1700-1 must not claim job 1700-10's file"
        );
    }

    #[tokio::test]
    async fn find_output_skips_partial_markers() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-0.mp4.part", b"half").await;
        write(&store, "1700-0.ytdl", b"state").await;

        let found = store.find_output(&JobId::from("1700-0")).await.unwrap();
        assert!(found.is_none(), "partial fragments are not finished output");
    }

    #[tokio::test]
    async fn find_output_reports_zero_size_files() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-0.mp4", b"").await;

        let entry = store
            .find_output(&JobId::from("1700-0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            entry.size_bytes, 0,
            "empty files must be surfaced so verification can fail them"
        );
    }

    #[tokio::test]
    async fn find_output_returns_none_for_unknown_prefix() {
        let (store, _dir) = test_store().await;
        assert!(
            store
                .find_output(&JobId::from("9999-9"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn find_output_prefers_lexicographically_first_match() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-0.webm", b"b").await;
        write(&store, "1700-0.mp4", b"a").await;

        let entry = store
            .find_output(&JobId::from("1700-0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.extension, "mp4", "scan order must be deterministic");
    }

    #[tokio::test]
    async fn remove_deletes_all_prefix_files_including_partials() {
        let (store, _dir) = test_store().await;
        write(&store, "1700-0.mp4", b"video").await;
        write(&store, "1700-0.mp4.part", b"half").await;
        let untouched = write(&store, "1700-1.mp4", b"other").await;

        let removed = store.remove(&JobId::from("1700-0")).await.unwrap();
        assert_eq!(removed, 2);
        assert!(untouched.exists(), "other jobs' files must not be touched");
    }

    #[tokio::test]
    async fn sweep_removes_expired_entries_and_keeps_fresh_ones() {
        let (store, _dir) = test_store().await;
        let old = write(&store, "1000-0.mp4", b"stale").await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let fresh = write(&store, "2000-0.mp4", b"active").await;

        let removed = store.sweep(Duration::from_millis(150)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!old.exists(), "expired entry must be reclaimed");
        assert!(
            fresh.exists(),
            "a concurrently-running job's fresh entry must be untouched"
        );
    }

    #[tokio::test]
    async fn sweep_with_long_retention_removes_nothing() {
        let (store, _dir) = test_store().await;
        let path = write(&store, "1700-0.mp4", b"video").await;

        let removed = store.sweep(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn sweeper_task_stops_on_cancellation() {
        let (store, _dir) = test_store().await;
        let store = Arc::new(store);
        let cancel = CancellationToken::new();

        let handle = spawn_sweeper(
            store,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            cancel.clone(),
        );

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper must exit promptly once cancelled")
            .unwrap();
    }
}

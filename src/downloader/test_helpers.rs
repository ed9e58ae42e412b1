//! Shared test fixtures for job manager tests.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::{Error, Result};
use crate::fetch::{DownloadSpec, FetchProcess, Fetcher, ProcessEvent, ProcessOutcome, ResolveOptions};
use crate::types::{JobId, Metadata};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};

/// A fetcher whose behavior is fully scripted by the test
///
/// Resolution results are consumed in order; the download script replays a
/// fixed set of output lines, optionally writes an output file where the
/// spec's template points, and terminates with the given exit code. All
/// calls are recorded for assertions.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    resolve_results: Mutex<Vec<Result<Metadata>>>,
    download: Mutex<Option<ScriptedDownload>>,
    pub(crate) resolve_calls: Mutex<Vec<ResolveOptions>>,
    pub(crate) download_calls: Mutex<Vec<DownloadSpec>>,
}

/// Script for one download process
#[derive(Default)]
pub(crate) struct ScriptedDownload {
    /// Stdout lines emitted before the hold point
    pub(crate) lines: Vec<String>,
    /// If set, the fake process waits here until the sender fires
    pub(crate) hold: Option<oneshot::Receiver<()>>,
    /// Exit code reported by the terminal event
    pub(crate) exit_code: i32,
    /// Stderr tail attached to the terminal event
    pub(crate) stderr_tail: Vec<String>,
    /// Output file written before termination: (extension, contents)
    pub(crate) output: Option<(&'static str, Vec<u8>)>,
    /// Simulate a launch failure instead of running at all
    pub(crate) launch_error: Option<String>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn push_resolve(&self, result: Result<Metadata>) {
        self.resolve_results.lock().await.push(result);
    }

    pub(crate) async fn script_download(&self, download: ScriptedDownload) {
        *self.download.lock().await = Some(download);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn resolve(&self, options: &ResolveOptions) -> Result<Metadata> {
        self.resolve_calls.lock().await.push(options.clone());
        let mut results = self.resolve_results.lock().await;
        if results.is_empty() {
            return Err(Error::Other("no scripted resolve result".to_string()));
        }
        results.remove(0)
    }

    async fn start_download(&self, spec: &DownloadSpec) -> Result<FetchProcess> {
        self.download_calls.lock().await.push(spec.clone());

        let script = self
            .download
            .lock()
            .await
            .take()
            .unwrap_or_default();
        if let Some(message) = script.launch_error {
            return Err(Error::Launch(message));
        }

        let output_path = script.output.as_ref().map(|(ext, _)| {
            spec.output_template
                .display()
                .to_string()
                .replace("%(ext)s", ext)
        });

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for line in script.lines {
                if tx.send(ProcessEvent::OutputLine(line)).await.is_err() {
                    return;
                }
            }
            if let Some(hold) = script.hold {
                let _ = hold.await;
            }
            if let (Some(path), Some((_, contents))) = (output_path, script.output) {
                tokio::fs::write(path, contents).await.ok();
            }
            let _ = tx
                .send(ProcessEvent::Terminated(ProcessOutcome {
                    code: Some(script.exit_code),
                    stderr_tail: script.stderr_tail,
                }))
                .await;
        });

        Ok(FetchProcess::from_channel(rx))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Metadata for a typical video resolution
pub(crate) fn video_metadata(title: &str, ext: &str) -> Metadata {
    Metadata {
        title: title.to_string(),
        ext: Some(ext.to_string()),
        duration: Some(30.0),
        uploader: Some("tester".to_string()),
        thumbnail: None,
        webpage_url: None,
    }
}

/// Build a downloader over a tempdir store with a near-zero settling delay
pub(crate) async fn create_test_downloader(
    fetcher: Arc<ScriptedFetcher>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.path().to_path_buf();
    config.download.settle_delay_ms = 10;

    let downloader = MediaDownloader::with_fetcher(config, fetcher)
        .await
        .expect("downloader");
    (downloader, temp_dir)
}

/// Poll the registry until the job reaches a terminal state
pub(crate) async fn wait_for_terminal(
    downloader: &MediaDownloader,
    id: &JobId,
) -> crate::types::Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(job) = downloader.registry.get(id).await {
            if job.state.is_terminal() {
                return job;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll the registry until the job's progress reaches at least `percent`
pub(crate) async fn wait_for_percent(downloader: &MediaDownloader, id: &JobId, percent: u8) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(job) = downloader.registry.get(id).await {
            if job.progress_percent >= percent {
                return;
            }
            assert!(
                !job.state.is_terminal(),
                "job {id} terminated at {}% before reaching {percent}%",
                job.progress_percent
            );
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} never reached {percent}%"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

//! Core job manager split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`jobs`] - Job submission, lifecycle state machine, artifact claiming

mod jobs;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{Fetcher, YtDlpFetcher};
use crate::registry::JobRegistry;
use crate::store::{self, TransientStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main job manager instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the registry, the transient store, and the fetcher seam. One
/// lifecycle task per submitted job is the sole writer of that job's
/// registry entry; the API layer only reads.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Job registry, the single source of truth for job state
    pub(crate) registry: Arc<JobRegistry>,
    /// Transient artifact store
    pub(crate) store: Arc<TransientStore>,
    /// External fetch tool (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Cancellation for background tasks (sweeper)
    pub(crate) shutdown: CancellationToken,
}

impl MediaDownloader {
    /// Create a new MediaDownloader
    ///
    /// Creates the transient store directory and discovers the yt-dlp
    /// binary (configured path, or PATH search).
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(YtDlpFetcher::from_config(&config.tool)?);
        Self::with_fetcher(config, fetcher).await
    }

    /// Create a MediaDownloader with a custom [`Fetcher`] implementation
    ///
    /// Useful for embedding a different fetch tool or for tests.
    pub async fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(TransientStore::open(config.download.temp_dir.clone()).await?);
        tracing::info!(
            temp_dir = %store.root().display(),
            fetcher = fetcher.name(),
            "Job manager initialized"
        );
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(JobRegistry::new()),
            store,
            fetcher,
            shutdown: CancellationToken::new(),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the periodic age-based store sweeper
    ///
    /// Runs until [`MediaDownloader::shutdown`] is called. The first sweep
    /// happens immediately, reclaiming leftovers from a previous run.
    pub fn start_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let handle = store::spawn_sweeper(
            self.store.clone(),
            self.config.download.sweep_interval,
            self.config.download.retention,
            self.shutdown.child_token(),
        );
        tracing::info!(
            interval_secs = self.config.download.sweep_interval.as_secs(),
            retention_secs = self.config.download.retention.as_secs(),
            "Transient store sweeper started"
        );
        handle
    }

    /// Spawn the API server as a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = Arc::new(self.clone());
        let config = self.config.clone();
        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }

    /// Stop background tasks
    ///
    /// In-flight jobs are not cancelled; their processes run to completion
    /// and the registry keeps their entries until retrieval or restart.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down job manager background tasks");
        self.shutdown.cancel();
    }
}

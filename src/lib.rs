//! # media-dl
//!
//! Backend library for media download applications driven by an external
//! yt-dlp style fetch tool.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Fire-and-forget** - Submitting a job returns an identifier
//!   immediately; the job runs in the background
//! - **Observable** - Any number of clients can stream a job's live
//!   progress until it terminates
//! - **Leak-free** - Transient storage is reclaimed after delivery or by an
//!   age-based sweep, whichever comes first
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let downloader = MediaDownloader::new(config).await?;
//!
//!     // Reclaim expired store entries in the background
//!     let _sweeper = downloader.start_sweeper();
//!
//!     // Serve the REST API
//!     let _api = downloader.spawn_api_server();
//!
//!     // Run until SIGTERM/SIGINT
//!     run_with_shutdown(downloader).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core job manager implementation
pub mod downloader;
/// Error types
pub mod error;
/// External fetch tool integration
pub mod fetch;
/// Filename derivation and content types
pub mod naming;
/// Best-effort progress line parsing
pub mod progress;
/// In-memory job registry
pub mod registry;
/// Transient artifact store with age-based eviction
pub mod store;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, AuthConfig, Config, DownloadConfig, ServerConfig, ToolConfig};
pub use downloader::MediaDownloader;
pub use error::{ApiError, Error, ErrorDetail, JobError, Result, ToHttpStatus};
pub use fetch::{DownloadSpec, FetchProcess, Fetcher, ProcessEvent, ProcessOutcome, ResolveOptions, YtDlpFetcher};
pub use registry::{JobRegistry, JobUpdate};
pub use store::TransientStore;
pub use types::{
    Artifact, DownloadRequest, FormatSelection, Job, JobId, JobState, Metadata, ProgressSnapshot,
    ResolveRequest, SnapshotStatus,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then stops the downloader's
/// background tasks. In-flight fetch processes are not killed; they run to
/// completion, but their jobs are lost with the registry on exit.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(downloader: MediaDownloader) {
    wait_for_signal().await;
    downloader.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

//! Job submission, lifecycle state machine, and artifact claiming.
//!
//! Each submitted job gets one task that walks the state progression
//! `Queued → Resolving → Downloading → Verifying → Complete/Failed`. That
//! task is the sole writer of the job's registry entry. Failures anywhere in
//! the pipeline land on the job's error field and never escape to the
//! caller; one job's failure must not affect other jobs or the service.

use super::MediaDownloader;
use crate::error::{Error, JobError, Result};
use crate::fetch::{DownloadSpec, FetchProcess, ProcessEvent, ProcessOutcome, ResolveOptions};
use crate::naming;
use crate::progress;
use crate::registry::JobUpdate;
use crate::types::{
    Artifact, DownloadRequest, FormatSelection, JobId, JobState, Metadata, ProgressSnapshot,
};
use std::path::PathBuf;
use url::Url;

/// Progress value shown the moment the fetch process is launched
const TRANSFER_START_PERCENT: u8 = 10;

/// Progress value shown while the store is being verified
const VERIFY_PERCENT: u8 = 95;

impl MediaDownloader {
    /// Resolve metadata for a URL
    ///
    /// Applies the platform's authentication material if configured. If
    /// resolution fails specifically because the cookie store is contended
    /// (a browser holding it locked), retries exactly once without
    /// authentication. This is the only built-in retry in the system.
    pub async fn resolve_metadata(&self, url: &Url, platform: Option<&str>) -> Result<Metadata> {
        let cookies = self.cookies_for(platform);
        let options = ResolveOptions {
            url: url.clone(),
            cookies,
        };

        match self.fetcher.resolve(&options).await {
            Err(err) if options.cookies.is_some() && err.is_auth_contention() => {
                tracing::warn!(
                    url = %url,
                    "Cookie store contended during resolution, retrying without authentication"
                );
                self.fetcher
                    .resolve(&ResolveOptions {
                        url: url.clone(),
                        cookies: None,
                    })
                    .await
            }
            other => other,
        }
    }

    /// Accept a new job and return its identifier immediately
    ///
    /// The job executes in the background; its outcome is only visible
    /// through the progress stream or a retrieval attempt.
    pub async fn submit(&self, request: DownloadRequest) -> JobId {
        let job = self.registry.create(request.url.clone()).await;
        let id = job.id.clone();
        tracing::info!(job_id = %id, url = %request.url, "Job accepted");

        let downloader = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            downloader.run_job(job_id, request).await;
        });

        id
    }

    /// Observer-facing snapshot of a job's current state
    pub async fn snapshot(&self, id: &JobId) -> Option<ProgressSnapshot> {
        self.registry.snapshot(id).await
    }

    /// Require a job to be `Complete` and return its artifact
    ///
    /// Unknown identifiers and non-complete jobs are reported distinctly so
    /// a client can tell "never existed / already delivered" from "not done
    /// yet".
    pub async fn claim_artifact(&self, id: &JobId) -> Result<Artifact> {
        let job = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| JobError::NotFound { id: id.clone() })?;

        match (&job.state, &job.artifact) {
            (JobState::Complete, Some(artifact)) => Ok(artifact.clone()),
            _ => Err(Error::Job(JobError::NotReady {
                id: id.clone(),
                state: job.state,
            })),
        }
    }

    /// Remove a delivered job's store entry and registry entry
    ///
    /// Called after a full artifact transfer. Errors are logged, not
    /// propagated: the age-based sweep reclaims anything left behind.
    pub async fn finish_retrieval(&self, id: &JobId) {
        match self.store.remove(id).await {
            Ok(removed) => {
                tracing::debug!(job_id = %id, removed, "Store entry cleaned up after delivery");
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %id,
                    error = %e,
                    "Could not delete store entry, the sweep will reclaim it"
                );
            }
        }
        self.registry.delete(id).await;
    }

    /// Run one job to a terminal state, recording any failure on the entry
    async fn run_job(&self, id: JobId, request: DownloadRequest) {
        if let Err(err) = self.execute_job(&id, &request).await {
            tracing::warn!(job_id = %id, error = %err, "Job failed");
            self.registry
                .update(
                    &id,
                    JobUpdate {
                        state: Some(JobState::Failed),
                        error: Some(err.to_string()),
                        ..JobUpdate::default()
                    },
                )
                .await;
        }
    }

    /// The state machine proper; any error is terminal for the job
    async fn execute_job(&self, id: &JobId, request: &DownloadRequest) -> Result<()> {
        self.registry
            .update(id, JobUpdate::state(JobState::Resolving))
            .await;

        let metadata = self
            .resolve_metadata(&request.url, request.platform.as_deref())
            .await?;

        let stem = naming::sanitize_stem(&metadata.title);
        let format = FormatSelection::from_id(request.format_id.as_deref());
        let (planned_ext, planned_type) = naming::plan_output(metadata.ext.as_deref(), &format);
        tracing::debug!(
            job_id = %id,
            filename = %naming::display_filename(&stem, &planned_ext),
            content_type = planned_type,
            "Resolved output naming"
        );

        let spec = DownloadSpec {
            url: request.url.clone(),
            format: applicable_format(format, planned_type),
            cookies: self.cookies_for(request.platform.as_deref()),
            output_template: self.store.output_template(id),
        };

        self.registry
            .update(
                id,
                JobUpdate::state_with_percent(JobState::Downloading, TRANSFER_START_PERCENT),
            )
            .await;

        let mut process = self.fetcher.start_download(&spec).await?;
        let outcome = self.pump_progress(id, &mut process).await;
        let outcome = outcome.ok_or_else(|| Error::Process {
            message: "fetch process ended without reporting an exit status".to_string(),
        })?;
        if !outcome.success() {
            return Err(Error::Process {
                message: outcome.describe(),
            });
        }

        self.registry
            .update(
                id,
                JobUpdate::state_with_percent(JobState::Verifying, VERIFY_PERCENT),
            )
            .await;
        // Absorb filesystem write-completion latency before trusting the scan
        tokio::time::sleep(self.config.download.settle_delay()).await;

        let entry = self
            .store
            .find_output(id)
            .await?
            .ok_or_else(|| JobError::NoOutputProduced { id: id.clone() })?;
        if entry.size_bytes == 0 {
            return Err(Error::Job(JobError::EmptyOutput {
                id: id.clone(),
                path: entry.path,
            }));
        }

        // The tool may have picked a different container than planned; the
        // file on disk is authoritative
        let actual_ext = if entry.extension.is_empty() {
            planned_ext
        } else {
            entry.extension.clone()
        };
        let artifact = Artifact {
            filename: naming::display_filename(&stem, &actual_ext),
            content_type: naming::content_type_for(&actual_ext).to_string(),
            size_bytes: entry.size_bytes,
            path: entry.path,
        };

        tracing::info!(
            job_id = %id,
            filename = %artifact.filename,
            size_bytes = artifact.size_bytes,
            "Job complete"
        );
        self.registry
            .update(
                id,
                JobUpdate {
                    state: Some(JobState::Complete),
                    progress_percent: Some(100),
                    artifact: Some(artifact),
                    ..JobUpdate::default()
                },
            )
            .await;
        Ok(())
    }

    /// Consume process events until the terminal result
    ///
    /// Progress updates are applied in arrival order and only when they move
    /// forward; the perceived progress never regresses.
    async fn pump_progress(
        &self,
        id: &JobId,
        process: &mut FetchProcess,
    ) -> Option<ProcessOutcome> {
        let mut last_percent = TRANSFER_START_PERCENT;
        while let Some(event) = process.next_event().await {
            match event {
                ProcessEvent::OutputLine(line) => {
                    let Some(event) = progress::parse_progress(&line) else {
                        continue;
                    };
                    if event.percent <= last_percent {
                        continue;
                    }
                    last_percent = event.percent;
                    self.registry
                        .update(
                            id,
                            JobUpdate {
                                progress_percent: Some(event.percent),
                                speed: event.speed,
                                eta: event.eta,
                                ..JobUpdate::default()
                            },
                        )
                        .await;
                }
                ProcessEvent::Terminated(outcome) => return Some(outcome),
            }
        }
        None
    }

    /// Authentication material for a platform, if configured and present
    fn cookies_for(&self, platform: Option<&str>) -> Option<PathBuf> {
        let platform = platform?;
        let gated = self
            .config
            .auth
            .platforms
            .iter()
            .any(|p| p.eq_ignore_ascii_case(platform));
        if !gated {
            return None;
        }
        let path = self.config.auth.cookies_file.as_ref()?;
        if path.exists() {
            Some(path.clone())
        } else {
            tracing::warn!(
                platform,
                cookies_file = %path.display(),
                "Cookie file not found, proceeding without authentication"
            );
            None
        }
    }
}

/// Decide whether format arguments apply to the resolved media
///
/// Stream selection and container merging only make sense for video; an
/// image post gets no format arguments at all. Audio extraction applies
/// regardless of what the metadata declared.
fn applicable_format(format: FormatSelection, planned_type: &str) -> Option<FormatSelection> {
    match format {
        FormatSelection::AudioOnly => Some(FormatSelection::AudioOnly),
        _ if planned_type.starts_with("video/") => Some(format),
        _ => None,
    }
}

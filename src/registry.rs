//! In-memory job registry
//!
//! The single source of truth for job state, consumed by both the progress
//! stream and the artifact-retrieval endpoint. One lifecycle task is the
//! sole writer for any given job; everything else reads. Contents are lost
//! on process restart, so in-flight jobs at restart time are unrecoverable,
//! which is accepted.

use crate::types::{Artifact, Job, JobId, JobState, ProgressSnapshot};
use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;

/// Partial update merged into a job by [`JobRegistry::update`]
///
/// Only fields that are `Some` are applied. The registry does not validate
/// state-machine legality; transition legality is the lifecycle manager's
/// responsibility.
#[derive(Clone, Debug, Default)]
pub struct JobUpdate {
    /// New state
    pub state: Option<JobState>,
    /// New progress percentage
    pub progress_percent: Option<u8>,
    /// New transfer speed
    pub speed: Option<String>,
    /// New ETA
    pub eta: Option<String>,
    /// Finished artifact
    pub artifact: Option<Artifact>,
    /// Failure cause
    pub error: Option<String>,
}

impl JobUpdate {
    /// Update that only moves the job to a new state
    pub fn state(state: JobState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Update that moves the job to a new state and progress percentage
    pub fn state_with_percent(state: JobState, percent: u8) -> Self {
        Self {
            state: Some(state),
            progress_percent: Some(percent),
            ..Self::default()
        }
    }
}

/// Concurrency-safe mapping from job identifier to job state
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new job in the `Queued` state and return a copy of it
    pub async fn create(&self, url: Url) -> Job {
        let job = Job::new(url);
        self.jobs
            .write()
            .await
            .insert(job.id.clone(), job.clone());
        job
    }

    /// Merge a partial update into an existing job
    ///
    /// Returns `false` if the identifier is unknown (e.g., the job was
    /// deleted after retrieval while its lifecycle task was still running).
    pub async fn update(&self, id: &JobId, update: JobUpdate) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };

        if let Some(state) = update.state {
            job.state = state;
        }
        if let Some(percent) = update.progress_percent {
            job.progress_percent = percent;
        }
        if let Some(speed) = update.speed {
            job.speed = Some(speed);
        }
        if let Some(eta) = update.eta {
            job.eta = Some(eta);
        }
        if let Some(artifact) = update.artifact {
            job.artifact = Some(artifact);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        true
    }

    /// Get a copy of a job by identifier
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Get the observer-facing snapshot of a job
    pub async fn snapshot(&self, id: &JobId) -> Option<ProgressSnapshot> {
        self.jobs.read().await.get(id).map(Job::snapshot)
    }

    /// Remove a job. Returns `false` if the identifier was unknown.
    pub async fn delete(&self, id: &JobId) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }

    /// Number of tracked jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the registry holds no jobs
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

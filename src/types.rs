//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;
use utoipa::ToSchema;

/// Process-wide sequence number folded into generated job identifiers so two
/// jobs accepted in the same millisecond never collide.
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a job
///
/// Opaque to clients. The string form contains only `[0-9-]` because it
/// doubles as the transient store filename prefix for the job's output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identifier from the current time and a process-wide
    /// counter. Identifiers are never reused within a process lifetime.
    pub fn generate() -> Self {
        let seq = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", Utc::now().timestamp_millis(), seq))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state
///
/// Progression is `Queued → Resolving → Downloading → Verifying → Complete`,
/// with `Failed` reachable from every non-terminal state. Once a job is
/// `Complete` or `Failed` it is never mutated again, only deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, lifecycle task not yet running
    Queued,
    /// Resolving metadata via the external tool
    Resolving,
    /// External fetch process running
    Downloading,
    /// Process exited, checking the transient store
    Verifying,
    /// Artifact ready for retrieval
    Complete,
    /// Terminal failure, see the job's error field
    Failed,
}

impl JobState {
    /// Whether this state is terminal (no further transitions occur)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Resolving => "resolving",
            JobState::Downloading => "downloading",
            JobState::Verifying => "verifying",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A finished artifact in the transient store
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Artifact {
    /// Location of the file in the transient store
    pub path: PathBuf,

    /// Display filename offered to the client (sanitized stem + real extension)
    pub filename: String,

    /// Content type resolved from the actual file extension
    pub content_type: String,

    /// File size in bytes (non-zero, verified at completion)
    pub size_bytes: u64,
}

/// One tracked request to produce a downloadable artifact
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Job {
    /// Unique job identifier
    pub id: JobId,

    /// Source URL being fetched
    #[schema(value_type = String)]
    pub url: Url,

    /// Current lifecycle state
    pub state: JobState,

    /// Progress percentage, 0-100. Non-decreasing; 100 only in `Complete`.
    pub progress_percent: u8,

    /// Last-known-good transfer speed as reported by the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Last-known-good ETA as reported by the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,

    /// Finished artifact. Present if and only if state is `Complete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,

    /// Failure cause. Present if and only if state is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the job was accepted
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `Queued` state with a fresh identifier
    pub fn new(url: Url) -> Self {
        Self {
            id: JobId::generate(),
            url,
            state: JobState::Queued,
            progress_percent: 0,
            speed: None,
            eta: None,
            artifact: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Build the observer-facing snapshot of this job
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.progress_percent,
            status: self.state.into(),
            speed: self.speed.clone(),
            eta: self.eta.clone(),
            error: self.error.clone(),
            filename: self.artifact.as_ref().map(|a| a.filename.clone()),
            size_bytes: self.artifact.as_ref().map(|a| a.size_bytes),
        }
    }
}

/// Observer-facing status, a superset of [`JobState`] with a `waiting`
/// variant for identifiers the registry does not know yet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// Identifier not registered yet (observer subscribed early)
    Waiting,
    /// See [`JobState::Queued`]
    Queued,
    /// See [`JobState::Resolving`]
    Resolving,
    /// See [`JobState::Downloading`]
    Downloading,
    /// See [`JobState::Verifying`]
    Verifying,
    /// See [`JobState::Complete`]
    Complete,
    /// See [`JobState::Failed`]
    Failed,
}

impl From<JobState> for SnapshotStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Queued => SnapshotStatus::Queued,
            JobState::Resolving => SnapshotStatus::Resolving,
            JobState::Downloading => SnapshotStatus::Downloading,
            JobState::Verifying => SnapshotStatus::Verifying,
            JobState::Complete => SnapshotStatus::Complete,
            JobState::Failed => SnapshotStatus::Failed,
        }
    }
}

/// One frame of the progress stream
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressSnapshot {
    /// Progress percentage, 0-100
    pub percent: u8,

    /// Current status
    pub status: SnapshotStatus,

    /// Transfer speed, if the tool reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Estimated time remaining, if the tool reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,

    /// Failure cause (terminal `failed` snapshots only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Artifact filename (terminal `complete` snapshots only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Artifact size in bytes (terminal `complete` snapshots only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl ProgressSnapshot {
    /// Snapshot emitted when the job identifier is not registered yet
    pub fn waiting() -> Self {
        Self {
            percent: 0,
            status: SnapshotStatus::Waiting,
            speed: None,
            eta: None,
            error: None,
            filename: None,
            size_bytes: None,
        }
    }

    /// Whether this snapshot reflects a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            SnapshotStatus::Complete | SnapshotStatus::Failed
        )
    }
}

/// Descriptive fields resolved by the external tool's metadata query
///
/// Parsed from the tool's JSON dump; unknown fields are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Metadata {
    /// Media title
    pub title: String,

    /// Declared container extension (the downloaded file may differ)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,

    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Uploader or channel name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,

    /// Thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Canonical page URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
}

/// Request body for submitting a new job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Source URL to fetch
    #[schema(value_type = String)]
    pub url: Url,

    /// Format selector: "audio", "480p", "720p", "1080p", or absent for best
    #[serde(default)]
    pub format_id: Option<String>,

    /// Source platform hint, used to decide whether authentication applies
    #[serde(default)]
    pub platform: Option<String>,
}

/// Request body for a metadata query
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveRequest {
    /// Source URL to inspect
    #[schema(value_type = String)]
    pub url: Url,

    /// Source platform hint, used to decide whether authentication applies
    #[serde(default)]
    pub platform: Option<String>,
}

/// Format-selection policy passed to the external tool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatSelection {
    /// Best combined video+audio stream
    Best,
    /// Best streams capped at the given pixel height
    CapHeight(u32),
    /// Audio only, extracted to mp3
    AudioOnly,
}

impl FormatSelection {
    /// Map a client-supplied format identifier onto the fixed policy set.
    /// Unrecognized identifiers fall back to `Best`.
    pub fn from_id(format_id: Option<&str>) -> Self {
        match format_id {
            Some("audio") => FormatSelection::AudioOnly,
            Some("480p") => FormatSelection::CapHeight(480),
            Some("720p") => FormatSelection::CapHeight(720),
            Some("1080p") => FormatSelection::CapHeight(1080),
            _ => FormatSelection::Best,
        }
    }
}

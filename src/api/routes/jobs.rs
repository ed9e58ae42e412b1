//! Job handlers: submission, progress streaming, artifact retrieval

use super::SubmitJobResponse;
use crate::api::AppState;
use crate::error::{Error, JobError, Result};
use crate::types::{DownloadRequest, JobId, ProgressSnapshot};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Cadence of the progress stream
const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(500);

/// POST /jobs - Submit a new download job
///
/// Always returns an identifier immediately; the job runs in the
/// background and failures are only visible through the progress stream or
/// a retrieval attempt.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = DownloadRequest,
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> impl IntoResponse {
    let job_id = state.downloader.submit(request).await;
    (StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id }))
}

/// State threaded through the progress stream
struct ProgressStream {
    downloader: Arc<crate::MediaDownloader>,
    id: JobId,
    interval: tokio::time::Interval,
    sent_waiting: bool,
    finished: bool,
}

/// GET /jobs/:id/progress - Server-sent progress snapshots
///
/// Emits one snapshot per cadence tick (the first immediately) until the
/// job reaches a terminal state, then emits that final snapshot and closes.
/// An unknown identifier yields a single `waiting` snapshot (an observer
/// may subscribe slightly before the registry entry exists), after which
/// the stream stays silent until the entry appears. Disconnecting cancels
/// only this observer's timer; the job itself is unaffected.
#[utoipa::path(
    get,
    path = "/jobs/{id}/progress",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Progress snapshot stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn job_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let mut interval = tokio::time::interval(SNAPSHOT_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let stream = futures::stream::unfold(
        ProgressStream {
            downloader: state.downloader.clone(),
            id: JobId::from(id),
            interval,
            sent_waiting: false,
            finished: false,
        },
        |mut st| async move {
            loop {
                if st.finished {
                    return None;
                }
                st.interval.tick().await;

                match st.downloader.snapshot(&st.id).await {
                    Some(snapshot) => {
                        if snapshot.is_terminal() {
                            st.finished = true;
                        }
                        return Some((Ok(snapshot_event(&snapshot)), st));
                    }
                    None if !st.sent_waiting => {
                        st.sent_waiting = true;
                        return Some((Ok(snapshot_event(&ProgressSnapshot::waiting())), st));
                    }
                    // Keep polling silently until the entry appears
                    None => continue,
                }
            }
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &ProgressSnapshot) -> SseEvent {
    match serde_json::to_string(snapshot) {
        Ok(data) => SseEvent::default().data(data),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize progress snapshot");
            SseEvent::default().data("{}")
        }
    }
}

/// Body stream that triggers cleanup once the file has been fully sent
///
/// The cleanup hook fires only when the inner stream is read to its end. An
/// aborted transfer drops the stream early and leaves the store entry for
/// the age-based sweep, so a client that retries keeps its artifact.
struct DeliveryStream<S> {
    inner: S,
    on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl<S: Stream + Unpin> Stream for DeliveryStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None) => {
                if let Some(hook) = this.on_complete.take() {
                    hook();
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// GET /jobs/:id/file - Retrieve the finished artifact
///
/// Requires the job to be `Complete`; unknown identifiers are 404 and
/// non-complete jobs are 409 with the current state in the message. After
/// the full transfer, the store entry and registry entry are deleted, so a
/// second retrieval with the same identifier returns 404.
#[utoipa::path(
    get,
    path = "/jobs/{id}/file",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 404, description = "Unknown job identifier", body = crate::error::ApiError),
        (status = 409, description = "Job is not complete yet", body = crate::error::ApiError)
    )
)]
pub async fn retrieve_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = JobId::from(id);
    let artifact = state.downloader.claim_artifact(&id).await?;

    let file = match tokio::fs::File::open(&artifact.path).await {
        Ok(file) => file,
        Err(e) => {
            // Registry says Complete but the file is gone (e.g., swept while
            // nobody retrieved it). From the client's view the artifact no
            // longer exists.
            tracing::warn!(job_id = %id, error = %e, "Complete job's artifact missing on disk");
            state.downloader.finish_retrieval(&id).await;
            return Err(Error::Job(JobError::NotFound { id }));
        }
    };

    let downloader = state.downloader.clone();
    let cleanup_id = id.clone();
    let body = DeliveryStream {
        inner: ReaderStream::new(file),
        on_complete: Some(Box::new(move || {
            tokio::spawn(async move {
                downloader.finish_retrieval(&cleanup_id).await;
            });
        })),
    };

    tracing::info!(
        job_id = %id,
        filename = %artifact.filename,
        size_bytes = artifact.size_bytes,
        "Streaming artifact"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.content_type)
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(body))
        .map_err(|e| Error::ApiServerError(format!("failed to build response: {e}")))
}

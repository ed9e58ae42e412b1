//! Metadata resolution handler

use crate::api::AppState;
use crate::error::Result;
use crate::types::{Metadata, ResolveRequest};
use axum::{Json, extract::State};

/// POST /metadata - Resolve descriptive fields for a URL
///
/// Synchronous from the client's perspective: the response carries either
/// the resolved metadata or an error with an optional remediation
/// suggestion. No download is started.
#[utoipa::path(
    post,
    path = "/metadata",
    tag = "metadata",
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved metadata", body = Metadata),
        (status = 502, description = "The fetch tool could not resolve the URL", body = crate::error::ApiError),
        (status = 503, description = "The fetch tool is not invocable", body = crate::error::ApiError)
    )
)]
pub async fn resolve_metadata(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<Metadata>> {
    tracing::info!(url = %request.url, platform = ?request.platform, "Metadata query");
    let metadata = state
        .downloader
        .resolve_metadata(&request.url, request.platform.as_deref())
        .await?;
    Ok(Json(metadata))
}

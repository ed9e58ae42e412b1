//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI specification for the media-dl REST API via utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.2.0",
        description = "REST API for submitting media download jobs, streaming their progress, and retrieving finished artifacts",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server")
    ),
    paths(
        // Metadata
        crate::api::routes::resolve_metadata,

        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::job_progress,
        crate::api::routes::retrieve_artifact,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobState,
        crate::types::Artifact,
        crate::types::Job,
        crate::types::SnapshotStatus,
        crate::types::ProgressSnapshot,
        crate::types::Metadata,
        crate::types::DownloadRequest,
        crate::types::ResolveRequest,
        crate::api::routes::SubmitJobResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "metadata", description = "Metadata resolution"),
        (name = "jobs", description = "Download job lifecycle"),
        (name = "system", description = "Health and documentation")
    )
)]
pub struct ApiDoc;

//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`metadata`] — Metadata resolution
//! - [`jobs`] — Job submission, progress streaming, artifact retrieval
//! - [`system`] — Health and OpenAPI

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod jobs;
mod metadata;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use metadata::*;
pub use system::*;

/// Response for POST /jobs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    /// Identifier of the accepted job
    pub job_id: JobId,
}

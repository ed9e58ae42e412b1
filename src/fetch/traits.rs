//! Pluggable interface to the external fetch tool

use super::process::FetchProcess;
use crate::error::Result;
use crate::types::{FormatSelection, Metadata};
use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

/// Parameters for a metadata query
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    /// Target URL
    pub url: Url,
    /// Cookie file to hand to the tool, already checked for existence
    pub cookies: Option<PathBuf>,
}

/// Parameters for launching a download
#[derive(Clone, Debug)]
pub struct DownloadSpec {
    /// Target URL
    pub url: Url,

    /// Format policy. `None` means no format arguments at all: the
    /// resolved media is not a video (e.g., an image post), so stream
    /// selection and container merging don't apply.
    pub format: Option<FormatSelection>,

    /// Cookie file to hand to the tool, already checked for existence
    pub cookies: Option<PathBuf>,

    /// Output-path template scoped to the job's unique store prefix
    pub output_template: PathBuf,
}

/// Interface to the external media-fetch tool
///
/// Implementations resolve metadata synchronously and launch downloads as
/// live processes. The default implementation is [`super::YtDlpFetcher`];
/// tests substitute scripted fakes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Run the tool's metadata-only mode and parse the result
    ///
    /// Never launches a download. A failed launch is [`crate::Error::Launch`];
    /// a tool-reported failure is [`crate::Error::Resolution`] carrying the
    /// tool's message and an optional remediation suggestion.
    async fn resolve(&self, options: &ResolveOptions) -> Result<Metadata>;

    /// Launch the download process
    ///
    /// Returns a live [`FetchProcess`] or [`crate::Error::Launch`] if the
    /// tool could not be started.
    async fn start_download(&self, spec: &DownloadSpec) -> Result<FetchProcess>;

    /// Implementation name, for logs
    fn name(&self) -> &'static str;
}

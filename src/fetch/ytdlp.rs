//! yt-dlp backed fetcher
//!
//! Builds the fixed argument set described by the external-interface
//! contract and never interprets the tool's semantics beyond it.

use super::process::{FetchProcess, spawn_process};
use super::traits::{DownloadSpec, Fetcher, ResolveOptions};
use crate::config::ToolConfig;
use crate::error::{Error, Result};
use crate::types::{FormatSelection, Metadata};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Default binary name searched on PATH
pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Fetcher implementation driving the external yt-dlp binary
///
/// # Examples
///
/// ```no_run
/// use media_dl::fetch::YtDlpFetcher;
///
/// // Auto-discover from PATH
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
///
/// // Or with an explicit path
/// let fetcher = YtDlpFetcher::new("/usr/local/bin/yt-dlp".into());
/// ```
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    extractor_retries: u32,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            extractor_retries: 3,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which(DEFAULT_BINARY).ok().map(Self::new)
    }

    /// Build a fetcher from tool configuration
    ///
    /// Uses the configured path if present, otherwise searches PATH.
    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        let fetcher = match &config.ytdlp_path {
            Some(path) => Self::new(path.clone()),
            None => Self::from_path().ok_or_else(|| {
                Error::Launch(format!("{DEFAULT_BINARY} not found in PATH"))
            })?,
        };
        Ok(fetcher.with_extractor_retries(config.extractor_retries))
    }

    /// Override the extractor retry count passed during resolution
    pub fn with_extractor_retries(mut self, retries: u32) -> Self {
        self.extractor_retries = retries;
        self
    }

    fn resolve_args(&self, options: &ResolveOptions) -> Vec<String> {
        let mut args = vec![
            options.url.to_string(),
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
        ];
        if let Some(cookies) = &options.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }
        args.push("--extractor-retries".to_string());
        args.push(self.extractor_retries.to_string());
        args
    }

    fn download_args(&self, spec: &DownloadSpec) -> Vec<String> {
        let mut args = vec![spec.url.to_string()];
        if let Some(cookies) = &spec.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        match spec.format {
            Some(FormatSelection::AudioOnly) => {
                args.extend(
                    [
                        "-f",
                        "bestaudio/best",
                        "-x",
                        "--audio-format",
                        "mp3",
                        "--audio-quality",
                        "0",
                    ]
                    .map(String::from),
                );
            }
            Some(FormatSelection::CapHeight(height)) => {
                args.push("-f".to_string());
                args.push(format!(
                    "bestvideo[height<={height}]+bestaudio/best[height<={height}]/best"
                ));
                args.extend(["--merge-output-format", "mp4"].map(String::from));
            }
            Some(FormatSelection::Best) => {
                args.extend(["-f", "bestvideo+bestaudio/best"].map(String::from));
                args.extend(["--merge-output-format", "mp4"].map(String::from));
            }
            None => {}
        }

        args.push("-o".to_string());
        args.push(spec.output_template.display().to_string());
        args.extend(["--no-warnings", "--no-playlist", "--newline"].map(String::from));
        args
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn resolve(&self, options: &ResolveOptions) -> Result<Metadata> {
        let args = self.resolve_args(options);
        let output = Command::new(&self.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Launch(format!("{}: {}", self.binary_path.display(), e)))?;

        if !output.status.success() {
            let message = stderr_excerpt(&output.stderr, output.status.code());
            let suggestion = suggestion_for(&message);
            return Err(Error::Resolution {
                message,
                suggestion,
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| Error::Resolution {
            message: format!("tool returned unparseable metadata: {e}"),
            suggestion: None,
        })
    }

    async fn start_download(&self, spec: &DownloadSpec) -> Result<FetchProcess> {
        let args = self.download_args(spec);
        tracing::debug!(url = %spec.url, "Launching fetch process");
        spawn_process(&self.binary_path, &args)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Pick the most useful part of the tool's stderr for a failure message
fn stderr_excerpt(stderr: &[u8], exit_code: Option<i32>) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    // yt-dlp prefixes fatal messages with "ERROR:"
    if let Some(line) = lines.iter().find(|l| l.starts_with("ERROR")) {
        return (*line).to_string();
    }
    if let Some(line) = lines.last() {
        return (*line).to_string();
    }
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Map well-known failure messages to remediation hints for the client
fn suggestion_for(message: &str) -> Option<String> {
    if message.contains("Could not copy") {
        return Some(
            "Close all browser windows holding the cookie database, or export a cookies.txt file"
                .to_string(),
        );
    }
    if message.contains("login required") || message.contains("rate-limit") {
        return Some(
            "This platform requires authentication. Export a cookies.txt file and configure it"
                .to_string(),
        );
    }
    None
}

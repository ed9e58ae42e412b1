//! External fetch tool integration
//!
//! The lifecycle manager treats the tool as an opaque producer of a file
//! plus a textual progress stream, behind the [`Fetcher`] trait:
//! - [`traits`] - The pluggable `Fetcher` interface and its request types
//! - [`process`] - Line-oriented subprocess execution
//! - [`ytdlp`] - The yt-dlp backed implementation

mod process;
mod traits;
mod ytdlp;

pub use process::{FetchProcess, ProcessEvent, ProcessOutcome, spawn_process};
pub use traits::{DownloadSpec, Fetcher, ResolveOptions};
pub use ytdlp::YtDlpFetcher;

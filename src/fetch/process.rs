//! Line-oriented subprocess execution for the fetch tool
//!
//! Spawning yields a [`FetchProcess`] delivering a finite event sequence:
//! zero or more [`ProcessEvent::OutputLine`]s followed by exactly one
//! [`ProcessEvent::Terminated`], after which the channel closes. A failed
//! launch (missing executable, permission denied) is reported immediately as
//! [`Error::Launch`], never conflated with a non-zero exit.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// How many trailing stderr lines are retained for failure messages
const STDERR_TAIL_LINES: usize = 8;

/// Event channel depth; the reader normally keeps up, this only absorbs bursts
const EVENT_BUFFER: usize = 64;

/// Terminal result of a fetch process, delivered exactly once
#[derive(Clone, Debug)]
pub struct ProcessOutcome {
    /// Exit code; `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Last few stderr lines, used as the failure cause on non-zero exit
    pub stderr_tail: Vec<String>,
}

impl ProcessOutcome {
    /// Whether the process exited cleanly
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable failure description, preferring the tool's own words
    pub fn describe(&self) -> String {
        if self.stderr_tail.is_empty() {
            match self.code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            self.stderr_tail.join("\n")
        }
    }
}

/// Asynchronous event from a running fetch process
#[derive(Clone, Debug)]
pub enum ProcessEvent {
    /// One line of standard output
    OutputLine(String),
    /// The process terminated; no further events follow
    Terminated(ProcessOutcome),
}

/// Handle to a running fetch process
///
/// Events arrive via [`FetchProcess::next_event`]; the stream ends after the
/// single `Terminated` event. Dropping the handle does not kill the process;
/// it runs to completion regardless of whether anyone is watching.
#[derive(Debug)]
pub struct FetchProcess {
    events: mpsc::Receiver<ProcessEvent>,
}

impl FetchProcess {
    /// Build a process handle from a pre-wired event channel
    ///
    /// Intended for alternative [`super::Fetcher`] implementations and tests.
    pub fn from_channel(events: mpsc::Receiver<ProcessEvent>) -> Self {
        Self { events }
    }

    /// Await the next event; `None` once the channel is closed
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }
}

/// Launch a command with stdout/stderr captured as line streams
///
/// Stdout lines become [`ProcessEvent::OutputLine`]s. Stderr lines are
/// logged at debug level and their tail is attached to the terminal outcome;
/// stderr content by itself never fails a job.
pub fn spawn_process(program: &Path, args: &[String]) -> Result<FetchProcess> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Launch(format!("{}: {}", program.display(), e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Launch("stdout pipe was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Launch("stderr pipe was not captured".to_string()))?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "media_dl::fetch", stderr = %line, "Fetch tool stderr");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>()
        });

        // Keep draining stdout even if the receiver went away, otherwise a
        // full pipe would wedge the child
        let mut forward = true;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if forward && tx.send(ProcessEvent::OutputLine(line)).await.is_err() {
                forward = false;
            }
        }

        let status = child.wait().await;
        let stderr_tail = stderr_task.await.unwrap_or_default();
        let outcome = match status {
            Ok(status) => ProcessOutcome {
                code: status.code(),
                stderr_tail,
            },
            Err(e) => ProcessOutcome {
                code: None,
                stderr_tail: vec![format!("failed to reap process: {e}")],
            },
        };
        let _ = tx.send(ProcessEvent::Terminated(outcome)).await;
    });

    Ok(FetchProcess::from_channel(rx))
}

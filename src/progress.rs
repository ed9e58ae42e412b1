//! Best-effort progress extraction from fetch tool output lines
//!
//! The external tool's progress lines look like
//! `[download]  42.3% of 10.00MiB at 2.50MiB/s ETA 00:05`, but the format is
//! not a stable contract. Extraction is therefore best-effort pattern
//! matching: lines that don't match simply produce no event, and a missed
//! line only delays the next visible update.

use regex::Regex;
use std::sync::OnceLock;

/// Ceiling applied to parsed percentages. The tool's numbers describe the
/// transfer phase only; 90-100 is reserved for verification and
/// finalization, so an observer sees 100 only once the artifact is verified.
pub const TRANSFER_CEILING: u8 = 90;

/// A normalized progress update extracted from one output line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Percentage, clamped to `0..=TRANSFER_CEILING`
    pub percent: u8,
    /// Transfer speed as printed by the tool, if present
    pub speed: Option<String>,
    /// ETA as printed by the tool, if present
    pub eta: Option<String>,
}

struct Patterns {
    percent: Regex,
    speed: Regex,
    eta: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static CELL: OnceLock<Option<Patterns>> = OnceLock::new();
    CELL.get_or_init(|| {
        Some(Patterns {
            percent: Regex::new(r"(\d{1,3}(?:\.\d+)?)%").ok()?,
            speed: Regex::new(r"at\s+([\d.]+\s*[KMGT]?i?B/s)").ok()?,
            eta: Regex::new(r"ETA\s+([\d:]+)").ok()?,
        })
    })
    .as_ref()
}

/// Extract a progress event from one raw output line
///
/// Returns `None` for lines without a recognizable percentage. Never fails:
/// a garbled line must not abort parsing of subsequent lines. The caller is
/// responsible for monotonicity (dropping events that would move progress
/// backwards); this function only clamps.
#[must_use]
pub fn parse_progress(line: &str) -> Option<ProgressEvent> {
    let patterns = patterns()?;

    let raw: f64 = patterns.percent.captures(line)?.get(1)?.as_str().parse().ok()?;
    let percent = raw.round().clamp(0.0, f64::from(TRANSFER_CEILING)) as u8;

    let speed = patterns
        .speed
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let eta = patterns
        .eta
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(ProgressEvent {
        percent,
        speed,
        eta,
    })
}

//! Summarizer for the JSON access log.
//!
//! Reads the lines written by the `reqmeter::access` events (see
//! `obs::logging`), buckets them into fixed time windows, and flags windows
//! that sit far from the mean. Runs as the `summarize` subcommand, either
//! over a whole file or (`--follow`) over lines appended to a live log.

pub mod anomaly;
pub mod follow;
pub mod window;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;

pub use anomaly::{detect_anomalies, Anomaly};
pub use follow::{follow, WindowTracker, FOLLOW_WINDOW};
pub use window::{
    aggregate, parse_line, write_csv, write_header, write_row, AccessRecord, WindowStats,
};

use crate::error::Result;

/// Default aggregation window (five minutes).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);

/// Read `path`, aggregate into `window`-sized buckets, and write CSV to
/// `out`. Returns the window stats for further processing.
pub fn summarize(path: &Path, window: Duration, out: impl Write) -> Result<Vec<WindowStats>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in reader.lines() {
        match parse_line(&line?) {
            Some(r) => records.push(r),
            None => skipped += 1,
        }
    }
    tracing::debug!(records = records.len(), skipped, "access log parsed");

    let stats = aggregate(&records, window);
    write_csv(&stats, out)?;
    Ok(stats)
}

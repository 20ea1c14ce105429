//! Live tail of the access log.
//!
//! Starts at the current end of the file and polls for appended lines.
//! Records are grouped into fixed windows; a window is emitted as one CSV
//! row once a record from a later window arrives, or once the wall clock
//! is past its end by more than `grace`. The open window is flushed on
//! shutdown.

use std::future::Future;
use std::io::{SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::MissedTickBehavior;

use super::window::{parse_line, window_secs, window_start, write_header, write_row, Acc};
use super::{AccessRecord, WindowStats};
use crate::error::Result;

/// Default window in follow mode.
pub const FOLLOW_WINDOW: Duration = Duration::from_secs(10);

/// Single open window over a stream of records.
#[derive(Debug)]
pub struct WindowTracker {
    width: i64,
    current: Option<(i64, Acc)>,
}

impl WindowTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            width: window_secs(window),
            current: None,
        }
    }

    /// Add one record. Returns the previous window when `r` opens a new one.
    pub fn push(&mut self, r: &AccessRecord) -> Option<WindowStats> {
        let start = window_start(&r.timestamp, self.width);
        let closed = match &self.current {
            Some((open, _)) if *open == start => None,
            Some(_) => self.flush(),
            None => None,
        };
        self.current
            .get_or_insert_with(|| (start, Acc::default()))
            .1
            .add(r);
        closed
    }

    /// Close the open window if `now` is past its end plus `grace`.
    pub fn close_if_elapsed(&mut self, now: DateTime<Utc>, grace: Duration) -> Option<WindowStats> {
        let (start, _) = self.current.as_ref()?;
        let grace = i64::try_from(grace.as_secs()).unwrap_or(i64::MAX);
        let end = start.saturating_add(self.width).saturating_add(grace);
        if now.timestamp() >= end {
            self.flush()
        } else {
            None
        }
    }

    pub fn flush(&mut self) -> Option<WindowStats> {
        let (start, acc) = self.current.take()?;
        acc.finish(start)
    }
}

/// Follow `path` until `shutdown` resolves, writing a CSV header and then
/// one row per closed window to `out`. Returns the number of rows written.
pub async fn follow<W, F>(
    path: &Path,
    window: Duration,
    poll: Duration,
    mut out: W,
    shutdown: F,
) -> Result<u64>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut file = tokio::fs::File::open(path).await?;
    let offset = file.seek(SeekFrom::End(0)).await?;
    tracing::info!(path = %path.display(), offset, window_secs = window.as_secs(), "following access log");

    let mut reader = BufReader::new(file);
    let mut tracker = WindowTracker::new(window);
    let mut pending = String::new();
    let mut written = 0u64;

    let mut emit = |out: &mut W, stats: Option<WindowStats>| -> Result<()> {
        if let Some(s) = stats {
            write_row(&mut *out, &s)?;
            out.flush()?;
            written += 1;
        }
        Ok(())
    };

    write_header(&mut out)?;
    out.flush()?;

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                loop {
                    let n = reader.read_line(&mut pending).await?;
                    // Keep a partial last line until the writer finishes it.
                    if n == 0 || !pending.ends_with('\n') {
                        break;
                    }
                    if let Some(r) = parse_line(&pending) {
                        emit(&mut out, tracker.push(&r))?;
                    }
                    pending.clear();
                }
                emit(&mut out, tracker.close_if_elapsed(Utc::now(), poll))?;
            }
        }
    }

    emit(&mut out, tracker.flush())?;
    tracing::info!(windows = written, "stopped following access log");
    Ok(written)
}

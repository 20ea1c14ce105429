//! Access-log parsing and fixed-window aggregation.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// One completed request as recorded in the access log.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub elapsed_ms: f64,
}

impl AccessRecord {
    pub fn is_error(&self) -> bool {
        self.status >= 500
    }
}

/// Aggregates for one window, keyed by the window's start.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub start: DateTime<Utc>,
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
}

/// Parse one JSON log line. Lines that are not JSON, or that carry no
/// `status`/`elapsed_ms` (startup messages and the like), yield `None`.
///
/// Request fields are read from the nested `fields` object written by
/// `tracing-subscriber`'s JSON formatter, or from the top level when events
/// are flattened.
pub fn parse_line(line: &str) -> Option<AccessRecord> {
    let v: Value = serde_json::from_str(line.trim()).ok()?;
    let fields = v.get("fields").filter(|f| f.is_object()).unwrap_or(&v);

    let status = u16::try_from(fields.get("status")?.as_u64()?).ok()?;
    let elapsed_ms = fields.get("elapsed_ms")?.as_f64()?;
    let timestamp = DateTime::parse_from_rfc3339(v.get("timestamp")?.as_str()?)
        .ok()?
        .with_timezone(&Utc);
    let text = |k: &str| {
        fields
            .get(k)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(AccessRecord {
        timestamp,
        method: text("method"),
        path: text("path"),
        status,
        elapsed_ms,
    })
}

/// Running totals for one window.
#[derive(Debug, Default)]
pub(crate) struct Acc {
    requests: u64,
    errors: u64,
    total_latency_ms: f64,
}

impl Acc {
    pub(crate) fn add(&mut self, r: &AccessRecord) {
        self.requests += 1;
        if r.is_error() {
            self.errors += 1;
        }
        self.total_latency_ms += r.elapsed_ms;
    }

    pub(crate) fn finish(&self, start: i64) -> Option<WindowStats> {
        let start = Utc.timestamp_opt(start, 0).single()?;
        let avg_latency_ms = if self.requests > 0 {
            self.total_latency_ms / self.requests as f64
        } else {
            0.0
        };
        Some(WindowStats {
            start,
            request_count: self.requests,
            error_count: self.errors,
            avg_latency_ms,
        })
    }
}

/// Window width in whole seconds, at least one.
pub(crate) fn window_secs(window: Duration) -> i64 {
    i64::try_from(window.as_secs()).unwrap_or(i64::MAX).max(1)
}

/// Start (unix seconds) of the window holding `ts`.
pub(crate) fn window_start(ts: &DateTime<Utc>, width: i64) -> i64 {
    let secs = ts.timestamp();
    secs - secs.rem_euclid(width)
}

/// Group records by `floor(timestamp / window)`, oldest window first.
pub fn aggregate(records: &[AccessRecord], window: Duration) -> Vec<WindowStats> {
    let width = window_secs(window);
    let mut windows: BTreeMap<i64, Acc> = BTreeMap::new();
    for r in records {
        windows.entry(window_start(&r.timestamp, width)).or_default().add(r);
    }
    windows
        .iter()
        .filter_map(|(start, acc)| acc.finish(*start))
        .collect()
}

pub fn write_header(mut out: impl Write) -> io::Result<()> {
    writeln!(out, "timestamp,request_count,error_count,avg_latency_ms")
}

pub fn write_row(mut out: impl Write, s: &WindowStats) -> io::Result<()> {
    writeln!(
        out,
        "{},{},{},{:.3}",
        s.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        s.request_count,
        s.error_count,
        s.avg_latency_ms
    )
}

pub fn write_csv(stats: &[WindowStats], mut out: impl Write) -> io::Result<()> {
    write_header(&mut out)?;
    for s in stats {
        write_row(&mut out, s)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ts: &str, status: u16, elapsed: f64) -> String {
        format!(
            r#"{{"timestamp":"{ts}","level":"INFO","fields":{{"message":"request completed","method":"GET","path":"/api/user","status":{status},"elapsed_ms":{elapsed}}},"target":"reqmeter::access"}}"#
        )
    }

    #[test]
    fn parses_nested_and_flat_lines() {
        let nested = parse_line(&line("2026-10-19T12:01:30.5Z", 200, 12.5)).unwrap();
        assert_eq!(nested.status, 200);
        assert_eq!(nested.method, "GET");
        assert_eq!(nested.path, "/api/user");
        assert_eq!(nested.elapsed_ms, 12.5);

        let flat = parse_line(
            r#"{"timestamp":"2026-10-19T12:01:30Z","status":500,"elapsed_ms":3,"method":"POST","path":"/api/order"}"#,
        )
        .unwrap();
        assert!(flat.is_error());
        assert_eq!(flat.elapsed_ms, 3.0);
    }

    #[test]
    fn skips_non_access_lines() {
        assert!(parse_line("not json").is_none());
        assert!(parse_line(r#"{"timestamp":"2026-10-19T12:00:00Z","fields":{"message":"listening"}}"#).is_none());
        assert!(parse_line(r#"{"fields":{"status":200,"elapsed_ms":1}}"#).is_none());
        assert!(parse_line(r#"{"timestamp":"yesterday","fields":{"status":200,"elapsed_ms":1}}"#).is_none());
    }

    #[test]
    fn aggregates_into_floored_windows() {
        let records: Vec<_> = [
            line("2026-10-19T12:00:01Z", 200, 10.0),
            line("2026-10-19T12:04:59Z", 500, 30.0),
            line("2026-10-19T12:05:00Z", 200, 5.0),
            line("2026-10-19T11:59:59Z", 200, 1.0),
        ]
        .iter()
        .filter_map(|l| parse_line(l))
        .collect();

        let stats = aggregate(&records, Duration::from_secs(300));
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].start.to_rfc3339_opts(SecondsFormat::Secs, true), "2026-10-19T11:55:00Z");
        assert_eq!(stats[1].request_count, 2);
        assert_eq!(stats[1].error_count, 1);
        assert_eq!(stats[1].avg_latency_ms, 20.0);
        assert_eq!(stats[2].request_count, 1);
    }

    #[test]
    fn csv_layout() {
        let records: Vec<_> = [line("2026-10-19T12:00:01Z", 200, 10.0)]
            .iter()
            .filter_map(|l| parse_line(l))
            .collect();
        let mut out = Vec::new();
        write_csv(&aggregate(&records, Duration::from_secs(300)), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "timestamp,request_count,error_count,avg_latency_ms\n2026-10-19T12:00:00Z,1,0,10.000\n"
        );
    }
}

//! Prometheus text exposition (format version 0.0.4).
//!
//! Output is a pure function of the snapshot content: families arrive
//! ordered by name and series are sorted here by their canonical label
//! string, so storage iteration order never leaks into the body.

use std::fmt::Write;

use crate::labels::escape_label_value;
use crate::snapshot::{FamilySnapshot, HistogramSample, SampleValue, SeriesSnapshot, Snapshot};

/// Media type served with the scrape body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render every family of `snapshot`.
pub fn encode(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for family in &snapshot.families {
        encode_family(family, &mut out);
    }
    out
}

fn encode_family(family: &FamilySnapshot, out: &mut String) {
    let name = &family.name;
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(&family.help));
    let _ = writeln!(out, "# TYPE {} {}", name, family.kind.as_str());

    let mut series: Vec<(String, &SeriesSnapshot)> = family
        .samples
        .iter()
        .map(|s| (s.labels.canonical(), s))
        .collect();
    series.sort_by(|a, b| a.0.cmp(&b.0));

    for (labels, s) in series {
        match &s.value {
            SampleValue::Counter(v) => {
                let _ = writeln!(out, "{}{} {}", name, braced(&labels), v);
            }
            SampleValue::Histogram(h) => encode_histogram(name, &labels, h, out),
        }
    }
}

fn encode_histogram(name: &str, labels: &str, h: &HistogramSample, out: &mut String) {
    let prefix = if labels.is_empty() {
        String::new()
    } else {
        format!("{labels},")
    };
    for (le, count) in &h.buckets {
        let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
    }
    let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, h.count);
    let _ = writeln!(out, "{}_sum{} {}", name, braced(labels), h.sum);
    let _ = writeln!(out, "{}_count{} {}", name, braced(labels), h.count);
}

fn braced(labels: &str) -> String {
    if labels.is_empty() {
        String::new()
    } else {
        format!("{{{labels}}}")
    }
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

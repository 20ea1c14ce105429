//! Distance-from-mean outlier detection over window stats.
//!
//! Each window is the vector `[request_count, error_count, avg_latency_ms]`.
//! A window is anomalous when its Euclidean distance from the mean vector
//! exceeds twice the mean of the per-dimension standard deviations.

use chrono::{DateTime, Utc};

use super::window::WindowStats;

const DIMS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub start: DateTime<Utc>,
    pub distance: f64,
    pub threshold: f64,
}

fn features(s: &WindowStats) -> [f64; DIMS] {
    [s.request_count as f64, s.error_count as f64, s.avg_latency_ms]
}

pub fn detect_anomalies(stats: &[WindowStats]) -> Vec<Anomaly> {
    if stats.is_empty() {
        return Vec::new();
    }
    let n = stats.len() as f64;
    let vectors: Vec<[f64; DIMS]> = stats.iter().map(features).collect();

    let mut mean = [0.0; DIMS];
    for v in &vectors {
        for (m, x) in mean.iter_mut().zip(v) {
            *m += x / n;
        }
    }
    let mut var = [0.0; DIMS];
    for v in &vectors {
        for ((acc, x), m) in var.iter_mut().zip(v).zip(&mean) {
            *acc += (x - m).powi(2) / n;
        }
    }
    let threshold = 2.0 * var.iter().map(|v| v.sqrt()).sum::<f64>() / DIMS as f64;

    stats
        .iter()
        .zip(&vectors)
        .filter_map(|(s, v)| {
            let distance = v
                .iter()
                .zip(&mean)
                .map(|(x, m)| (x - m).powi(2))
                .sum::<f64>()
                .sqrt();
            (distance > threshold).then(|| Anomaly {
                start: s.start,
                distance,
                threshold,
            })
        })
        .collect()
}

//! Per-request instrumentation protocol.
//!
//! `RequestMetrics::start` captures a monotonic start time and returns an
//! `InFlight` guard. The guard records exactly once: either through
//! `finish(status)` or, if the request future is dropped early or a panic
//! unwinds through it, from `Drop` with a synthetic status.
//!
//! Recording failures never reach the caller. They are logged and the
//! sample is dropped, so instrumentation cannot fail the measured request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::counter::Counter;
use crate::error::{MetricsError, Result};
use crate::histogram::{Buckets, DurationUnit, Histogram};
use crate::labels::LabelSet;
use crate::registry::Registry;

/// Label schema shared by the request counter and the latency histogram.
pub const REQUEST_LABELS: [&str; 3] = ["method", "path", "status"];

/// Status recorded when the request future is dropped before completion.
pub const STATUS_CANCELLED: u16 = 499;
/// Status recorded when a panic unwinds through an unfinished request.
pub const STATUS_PANICKED: u16 = 500;

/// Default latency buckets, in milliseconds.
pub const DEFAULT_BUCKETS_MS: [f64; 11] = [
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0,
];

/// Target of the per-request access-log event.
pub const ACCESS_LOG_TARGET: &str = "reqmeter::access";

#[derive(Debug, Clone)]
pub struct RequestMetricsConfig {
    pub requests_name: String,
    pub requests_help: String,
    pub duration_name: String,
    pub duration_help: String,
    pub buckets: Vec<f64>,
    pub unit: DurationUnit,
}

impl Default for RequestMetricsConfig {
    fn default() -> Self {
        Self {
            requests_name: "http_requests_total".into(),
            requests_help: "Total number of HTTP requests".into(),
            duration_name: "http_request_duration_ms".into(),
            duration_help: "Duration of HTTP requests in ms".into(),
            buckets: DEFAULT_BUCKETS_MS.to_vec(),
            unit: DurationUnit::Millis,
        }
    }
}

/// Monotonic request timer.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since `start`. A clock that moved backwards is reported as an
    /// error instead of being clamped to zero.
    pub fn elapsed(&self) -> Result<Duration> {
        Instant::now().checked_duration_since(self.start).ok_or_else(|| {
            MetricsError::InvalidObservation("monotonic clock went backwards".into())
        })
    }
}

/// Request counter + latency histogram pair.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    requests: Arc<Counter>,
    duration: Arc<Histogram>,
    unit: DurationUnit,
}

impl RequestMetrics {
    pub fn register(registry: &Registry, cfg: &RequestMetricsConfig) -> Result<Self> {
        let buckets = Buckets::new(cfg.buckets.clone())?;
        let requests =
            registry.register_counter(&cfg.requests_name, &cfg.requests_help, &REQUEST_LABELS)?;
        let duration = registry.register_histogram(
            &cfg.duration_name,
            &cfg.duration_help,
            &REQUEST_LABELS,
            buckets,
        )?;
        Ok(Self {
            requests,
            duration,
            unit: cfg.unit,
        })
    }

    /// Begin timing one request.
    pub fn start(&self, method: impl Into<String>, path: impl Into<String>) -> InFlight {
        InFlight {
            metrics: self.clone(),
            timer: Timer::start(),
            method: method.into(),
            path: path.into(),
            done: false,
        }
    }

    /// Record a completed request. Errors are logged, never returned.
    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
        if status >= 500 {
            tracing::error!(target: ACCESS_LOG_TARGET, %method, %path, status, elapsed_ms, "request completed");
        } else {
            tracing::info!(target: ACCESS_LOG_TARGET, %method, %path, status, elapsed_ms, "request completed");
        }

        if let Err(e) = self.try_record(method, path, status, elapsed) {
            tracing::warn!(
                code = e.code().as_str(),
                error = %e,
                %method,
                %path,
                status,
                "request sample dropped"
            );
        }
    }

    fn try_record(&self, method: &str, path: &str, status: u16, elapsed: Duration) -> Result<()> {
        let labels = LabelSet::new([
            ("method", method.to_string()),
            ("path", path.to_string()),
            ("status", status.to_string()),
        ]);
        // Validate the observation before touching the counter so a bad
        // sample leaves both metrics unchanged.
        let value = self.unit.convert(elapsed);
        if !value.is_finite() {
            return Err(MetricsError::InvalidObservation(format!("{value}")));
        }
        let count = self.requests.get_or_create(&labels)?;
        let hist = self.duration.get_or_create(&labels)?;
        count.inc()?;
        hist.observe(value)
    }

    pub fn requests(&self) -> &Arc<Counter> {
        &self.requests
    }

    pub fn duration(&self) -> &Arc<Histogram> {
        &self.duration
    }
}

/// Guard for one in-flight request. Records exactly once.
#[derive(Debug)]
pub struct InFlight {
    metrics: RequestMetrics,
    timer: Timer,
    method: String,
    path: String,
    done: bool,
}

impl InFlight {
    /// Record completion with the final status. Returns the measured
    /// latency, or `None` if the clock check failed and nothing was recorded.
    pub fn finish(mut self, status: u16) -> Option<Duration> {
        self.complete(status)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn complete(&mut self, status: u16) -> Option<Duration> {
        if self.done {
            return None;
        }
        self.done = true;

        match self.timer.elapsed() {
            Ok(elapsed) => {
                self.metrics.record(&self.method, &self.path, status, elapsed);
                Some(elapsed)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    method = %self.method,
                    path = %self.path,
                    status,
                    "request sample dropped"
                );
                None
            }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let status = if std::thread::panicking() {
            STATUS_PANICKED
        } else {
            STATUS_CANCELLED
        };
        self.complete(status);
    }
}

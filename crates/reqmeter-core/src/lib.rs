//! reqmeter core: in-process metrics engine for request instrumentation.
//!
//! This crate owns the counter/histogram registry, the canonical label-set
//! key, the text exposition encoder, and the per-request completion
//! protocol. It carries no transport or runtime dependencies so the HTTP
//! layer (or any other caller) can feed it through a narrow API.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every rejected
//! operation surfaces as `MetricsError` and leaves registry state untouched.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod counter;
pub mod descriptor;
pub mod error;
pub mod exposition;
pub mod histogram;
pub mod instrument;
pub mod labels;
pub mod registry;
pub mod snapshot;

pub use counter::{Counter, CounterHandle};
pub use descriptor::{Descriptor, MetricKind};
pub use error::{ErrorCode, MetricsError, Result};
pub use histogram::{Buckets, DurationUnit, Histogram, HistogramHandle};
pub use instrument::{InFlight, RequestMetrics, RequestMetricsConfig, Timer};
pub use labels::LabelSet;
pub use registry::Registry;
pub use snapshot::{FamilySnapshot, HistogramSample, SampleValue, SeriesSnapshot, Snapshot};

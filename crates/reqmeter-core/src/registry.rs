//! Metric registry: one namespace of counters and histograms.
//!
//! No code path panics while holding the name-index lock, so a poisoned
//! lock is recovered rather than surfaced.
//!
//! Registration is rare and takes a write lock on the name index. Recording
//! never touches that lock: callers hold `Arc<Counter>` / `Arc<Histogram>`
//! directly. `snapshot()` takes the read lock only long enough to clone the
//! metric handles, then reads each series under its own short lock.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use crate::counter::Counter;
use crate::error::{MetricsError, Result};
use crate::exposition;
use crate::histogram::{Buckets, Histogram};
use crate::snapshot::Snapshot;

#[derive(Clone)]
enum Metric {
    Counter(Arc<Counter>),
    Histogram(Arc<Histogram>),
}

/// Owns every metric for the life of the process. Construct once at startup
/// and pass `Arc<Registry>` to whoever records or scrapes.
#[derive(Default)]
pub struct Registry {
    // BTreeMap keeps snapshot order lexicographic by name.
    metrics: RwLock<BTreeMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a counter. Registering an identical definition again returns
    /// the existing metric; any conflicting definition fails.
    pub fn register_counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<Arc<Counter>> {
        let candidate = Counter::new(name, help, label_names)?;
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);

        match metrics.get(name) {
            Some(Metric::Counter(existing)) if existing.descriptor() == candidate.descriptor() => {
                Ok(Arc::clone(existing))
            }
            Some(_) => Err(MetricsError::DuplicateMetric(name.to_string())),
            None => {
                check_sample_names(&metrics, name, false)?;
                let counter = Arc::new(candidate);
                metrics.insert(name.to_string(), Metric::Counter(Arc::clone(&counter)));
                tracing::debug!(metric = %name, "counter registered");
                Ok(counter)
            }
        }
    }

    /// Register a histogram. Same duplicate contract as `register_counter`,
    /// with bucket bounds part of the definition.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Buckets,
    ) -> Result<Arc<Histogram>> {
        let candidate = Histogram::new(name, help, label_names, buckets)?;
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);

        match metrics.get(name) {
            Some(Metric::Histogram(existing))
                if existing.descriptor() == candidate.descriptor()
                    && existing.buckets() == candidate.buckets() =>
            {
                Ok(Arc::clone(existing))
            }
            Some(_) => Err(MetricsError::DuplicateMetric(name.to_string())),
            None => {
                check_sample_names(&metrics, name, true)?;
                let histogram = Arc::new(candidate);
                metrics.insert(name.to_string(), Metric::Histogram(Arc::clone(&histogram)));
                tracing::debug!(metric = %name, "histogram registered");
                Ok(histogram)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent per-series view of every metric. Different series may be
    /// read at slightly different instants; a single series never tears.
    pub fn snapshot(&self) -> Snapshot {
        let metrics: Vec<Metric> = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let families = metrics
            .iter()
            .map(|m| match m {
                Metric::Counter(c) => c.snapshot(),
                Metric::Histogram(h) => h.snapshot(),
            })
            .collect();
        Snapshot { families }
    }

    /// Scrape entry point: `(content type, body)`.
    pub fn render_exposition(&self) -> (&'static str, Bytes) {
        let body = exposition::encode(&self.snapshot());
        (exposition::CONTENT_TYPE, Bytes::from(body))
    }
}

/// Sample-name suffixes a histogram family emits besides its own name.
const HISTOGRAM_SUFFIXES: [&str; 3] = ["_bucket", "_sum", "_count"];

/// Reject `name` when its exposed sample names would overlap another
/// family's: a name equal to `<histogram>_sum` and friends, or a new
/// histogram whose derived names are already taken.
fn check_sample_names(metrics: &BTreeMap<String, Metric>, name: &str, histogram: bool) -> Result<()> {
    for suffix in HISTOGRAM_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            if let Some(Metric::Histogram(_)) = metrics.get(base) {
                return Err(MetricsError::DuplicateMetric(format!(
                    "{name} clashes with samples of histogram {base}"
                )));
            }
        }
        if histogram {
            let derived = format!("{name}{suffix}");
            if metrics.contains_key(&derived) {
                return Err(MetricsError::DuplicateMetric(format!(
                    "histogram {name} would emit {derived}, already registered"
                )));
            }
        }
    }
    Ok(())
}

//! Monotonic counters partitioned by label set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::descriptor::{Descriptor, MetricKind};
use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;
use crate::snapshot::{FamilySnapshot, SampleValue, SeriesSnapshot};

#[derive(Debug)]
pub struct Counter {
    desc: Descriptor,
    series: DashMap<LabelSet, Arc<AtomicU64>>,
}

/// Cheap handle to one counter series.
#[derive(Clone, Debug)]
pub struct CounterHandle {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub(crate) fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        Ok(Self {
            desc: Descriptor::new(name, help, MetricKind::Counter, label_names)?,
            series: DashMap::new(),
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// Look up the series for `labels`, creating a zero entry if absent.
    /// Concurrent first-time callers all receive the same entry.
    pub fn get_or_create(&self, labels: &LabelSet) -> Result<CounterHandle> {
        self.desc.check_labels(labels)?;
        if let Some(existing) = self.series.get(labels) {
            return Ok(CounterHandle {
                value: Arc::clone(existing.value()),
            });
        }
        let value = self
            .series
            .entry(labels.clone())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .value()
            .clone();
        Ok(CounterHandle { value })
    }

    pub fn inc(&self, labels: &LabelSet) -> Result<()> {
        self.get_or_create(labels)?.inc()
    }

    /// Validates `delta` before resolving the series, so a rejected
    /// increment never creates an empty entry.
    pub fn inc_by(&self, labels: &LabelSet, delta: i64) -> Result<()> {
        check_delta(delta)?;
        self.get_or_create(labels)?.inc_by(delta)
    }

    /// Current total for `labels`, if the series exists.
    pub fn get(&self, labels: &LabelSet) -> Option<u64> {
        self.series.get(labels).map(|v| v.load(Ordering::Acquire))
    }

    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        let samples = self
            .series
            .iter()
            .map(|r| SeriesSnapshot {
                labels: r.key().clone(),
                value: SampleValue::Counter(r.value().load(Ordering::Acquire)),
            })
            .collect();
        FamilySnapshot::new(&self.desc, samples)
    }
}

impl CounterHandle {
    pub fn inc(&self) -> Result<()> {
        self.inc_by(1)
    }

    /// Add `delta` atomically. Negative deltas and overflow are rejected
    /// without touching the stored total.
    pub fn inc_by(&self, delta: i64) -> Result<()> {
        let delta = check_delta(delta)?;
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_add(delta))
            .map(|_| ())
            .map_err(|cur| MetricsError::InvalidDelta(format!("{cur} + {delta} overflows")))
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

fn check_delta(delta: i64) -> Result<u64> {
    u64::try_from(delta).map_err(|_| MetricsError::InvalidDelta(format!("{delta} is negative")))
}

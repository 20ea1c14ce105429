//! Fixed-boundary histograms with cumulative buckets.
//!
//! Each series keeps its bucket counts, sum, and count behind one small
//! mutex. An observation updates all three inside the same critical section
//! and the snapshot path copies them under that lock, so no reader ever sees
//! a count that disagrees with its buckets.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;

use crate::descriptor::{Descriptor, MetricKind};
use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;
use crate::snapshot::{FamilySnapshot, HistogramSample, SampleValue, SeriesSnapshot};

/// Validated bucket upper bounds, shared by every series of a histogram.
/// `+Inf` is implicit and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets(Arc<[f64]>);

impl Buckets {
    /// Bounds must be non-empty, finite, and strictly ascending.
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(MetricsError::InvalidBuckets("no bucket bounds".into()));
        }
        if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(MetricsError::InvalidBuckets(format!(
                "bound {b} is not finite"
            )));
        }
        if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidBuckets(format!(
                "bounds not strictly ascending at {} >= {}",
                w[0], w[1]
            )));
        }
        Ok(Self(bounds.into()))
    }

    pub fn bounds(&self) -> &[f64] {
        &self.0
    }

    /// Index of the first bucket whose bound is `>= value` (inclusive upper
    /// bound). `len()` means only `+Inf` holds the value.
    fn first_index(&self, value: f64) -> usize {
        self.0.partition_point(|b| *b < value)
    }
}

/// Unit used when recording a `Duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationUnit {
    Seconds,
    #[default]
    Millis,
}

impl DurationUnit {
    pub fn convert(self, d: Duration) -> f64 {
        match self {
            DurationUnit::Seconds => d.as_secs_f64(),
            DurationUnit::Millis => d.as_secs_f64() * 1_000.0,
        }
    }
}

#[derive(Debug)]
struct SeriesState {
    /// Cumulative: `cumulative[i]` counts observations `<= bounds[i]`.
    cumulative: Vec<u64>,
    sum: f64,
    count: u64,
}

#[derive(Debug)]
struct Series {
    buckets: Buckets,
    state: Mutex<SeriesState>,
}

impl Series {
    fn new(buckets: Buckets) -> Self {
        let n = buckets.bounds().len();
        Self {
            buckets,
            state: Mutex::new(SeriesState {
                cumulative: vec![0; n],
                sum: 0.0,
                count: 0,
            }),
        }
    }

    // Nothing inside the critical section can panic (counts saturate), so
    // a poisoned lock still guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, SeriesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct Histogram {
    desc: Descriptor,
    buckets: Buckets,
    series: DashMap<LabelSet, Arc<Series>>,
}

/// Cheap handle to one histogram series.
#[derive(Clone, Debug)]
pub struct HistogramHandle {
    series: Arc<Series>,
}

impl Histogram {
    pub(crate) fn new(name: &str, help: &str, label_names: &[&str], buckets: Buckets) -> Result<Self> {
        Ok(Self {
            desc: Descriptor::new(name, help, MetricKind::Histogram, label_names)?,
            buckets,
            series: DashMap::new(),
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Same lookup/creation/schema contract as `Counter::get_or_create`.
    pub fn get_or_create(&self, labels: &LabelSet) -> Result<HistogramHandle> {
        self.desc.check_labels(labels)?;
        if let Some(existing) = self.series.get(labels) {
            return Ok(HistogramHandle {
                series: Arc::clone(existing.value()),
            });
        }
        let series = self
            .series
            .entry(labels.clone())
            .or_insert_with(|| Arc::new(Series::new(self.buckets.clone())))
            .value()
            .clone();
        Ok(HistogramHandle { series })
    }

    /// Validates `value` before resolving the series, so a rejected sample
    /// never creates an empty entry.
    pub fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        check_observation(value)?;
        self.get_or_create(labels)?.observe(value)
    }

    pub fn get(&self, labels: &LabelSet) -> Option<HistogramSample> {
        self.series.get(labels).map(|s| read_series(s.value()))
    }

    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        let samples = self
            .series
            .iter()
            .map(|r| SeriesSnapshot {
                labels: r.key().clone(),
                value: SampleValue::Histogram(read_series(r.value())),
            })
            .collect();
        FamilySnapshot::new(&self.desc, samples)
    }
}

impl HistogramHandle {
    /// Record one observation. Negative and non-finite values are rejected
    /// before the lock is taken.
    pub fn observe(&self, value: f64) -> Result<()> {
        check_observation(value)?;
        let first = self.series.buckets.first_index(value);
        let mut state = self.series.lock();
        for c in state.cumulative.iter_mut().skip(first) {
            *c = c.saturating_add(1);
        }
        state.count = state.count.saturating_add(1);
        state.sum += value;
        Ok(())
    }

    pub fn observe_duration(&self, d: Duration, unit: DurationUnit) -> Result<()> {
        self.observe(unit.convert(d))
    }

    pub fn snapshot(&self) -> HistogramSample {
        read_series(&self.series)
    }
}

fn check_observation(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MetricsError::InvalidObservation(format!(
            "{value} is not a finite non-negative number"
        )));
    }
    Ok(())
}

fn read_series(series: &Series) -> HistogramSample {
    let state = series.lock();
    HistogramSample {
        buckets: series
            .buckets
            .bounds()
            .iter()
            .copied()
            .zip(state.cumulative.iter().copied())
            .collect(),
        sum: state.sum,
        count: state.count,
    }
}

//! Point-in-time copies of registry state.
//!
//! A `Snapshot` owns plain values only; once built it never changes and
//! holds no locks, so encoding it cannot stall writers.

use crate::descriptor::{Descriptor, MetricKind};
use crate::labels::LabelSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Ordered lexicographically by metric name.
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<SeriesSnapshot>,
}

impl FamilySnapshot {
    pub(crate) fn new(desc: &Descriptor, samples: Vec<SeriesSnapshot>) -> Self {
        Self {
            name: desc.name().to_string(),
            help: desc.help().to_string(),
            kind: desc.kind(),
            samples,
        }
    }

    pub fn sample(&self, labels: &LabelSet) -> Option<&SampleValue> {
        self.samples
            .iter()
            .find(|s| &s.labels == labels)
            .map(|s| &s.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub labels: LabelSet,
    pub value: SampleValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(u64),
    Histogram(HistogramSample),
}

/// One histogram series as read under its lock.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    /// `(upper bound, cumulative count)` for every finite bound.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

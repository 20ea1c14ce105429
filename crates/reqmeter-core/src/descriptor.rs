//! Metric identity: name, help text, kind, and declared label schema.

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    /// Value of the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Immutable definition shared by every series of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    name: String,
    help: String,
    kind: MetricKind,
    /// Declaration order.
    label_names: Vec<String>,
    /// Same names, sorted; compared against `LabelSet::names()`.
    schema: Vec<String>,
}

impl Descriptor {
    pub(crate) fn new(name: &str, help: &str, kind: MetricKind, label_names: &[&str]) -> Result<Self> {
        validate_metric_name(name)?;
        let mut schema = Vec::with_capacity(label_names.len());
        for &label in label_names {
            validate_label_name(label)?;
            if kind == MetricKind::Histogram && label == "le" {
                return Err(MetricsError::InvalidName(format!(
                    "label `le` is reserved on histogram {name}"
                )));
            }
            schema.push(label.to_string());
        }
        schema.sort();
        if schema.windows(2).any(|w| w[0] == w[1]) {
            return Err(MetricsError::InvalidName(format!(
                "repeated label name on {name}"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Reject a label set whose names differ from the declared schema.
    pub fn check_labels(&self, labels: &LabelSet) -> Result<()> {
        let matches = labels.len() == self.schema.len()
            && labels.names().zip(self.schema.iter()).all(|(a, b)| a == b);
        if matches {
            return Ok(());
        }
        Err(MetricsError::SchemaMismatch {
            metric: self.name.clone(),
            expected: self.schema.join(","),
            got: labels.names().collect::<Vec<_>>().join(","),
        })
    }
}

fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(format!("metric name {name:?}")))
    }
}

fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !ok || name.starts_with("__") {
        return Err(MetricsError::InvalidName(format!("label name {name:?}")));
    }
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use reqmeter_core::instrument::DEFAULT_BUCKETS_MS;
use reqmeter_core::{Buckets, DurationUnit, RequestMetricsConfig};

use crate::error::{GatewayError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub demo: DemoSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            logging: LoggingSection::default(),
            demo: DemoSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewayError::UnsupportedVersion(self.version));
        }
        self.server.validate()?;
        self.metrics.validate()?;
        self.demo.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            GatewayError::Config(format!("server.listen {:?} is not a socket address: {e}", self.listen))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_path")]
    pub path: String,

    #[serde(default = "default_requests_name")]
    pub requests_name: String,

    #[serde(default = "default_duration_name")]
    pub duration_name: String,

    #[serde(default = "default_duration_buckets_ms")]
    pub duration_buckets_ms: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            requests_name: default_requests_name(),
            duration_name: default_duration_name(),
            duration_buckets_ms: default_duration_buckets_ms(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(GatewayError::Config("metrics.path must start with '/'".into()));
        }
        if self.requests_name == self.duration_name {
            return Err(GatewayError::Config(
                "metrics.requests_name and metrics.duration_name must differ".into(),
            ));
        }
        Buckets::new(self.duration_buckets_ms.clone())?;
        Ok(())
    }

    pub fn request_metrics(&self) -> RequestMetricsConfig {
        RequestMetricsConfig {
            requests_name: self.requests_name.clone(),
            duration_name: self.duration_name.clone(),
            buckets: self.duration_buckets_ms.clone(),
            unit: DurationUnit::Millis,
            ..RequestMetricsConfig::default()
        }
    }
}

fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_requests_name() -> String {
    "http_requests_total".into()
}
fn default_duration_name() -> String {
    "http_request_duration_ms".into()
}
fn default_duration_buckets_ms() -> Vec<f64> {
    DEFAULT_BUCKETS_MS.to_vec()
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Append records to this file instead of stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_error_rate")]
    pub error_rate: f64,

    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            enabled: true,
            error_rate: default_error_rate(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}

impl DemoSection {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(GatewayError::Config(
                "demo.error_rate must be between 0.0 and 1.0".into(),
            ));
        }
        if self.max_latency_ms > 10_000 {
            return Err(GatewayError::Config(
                "demo.max_latency_ms must be at most 10000".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_error_rate() -> f64 {
    0.2
}
fn default_max_latency_ms() -> u64 {
    100
}

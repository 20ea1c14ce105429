//! Gateway error type (startup, config, log and traffic tooling).
//!
//! Request handling never returns these: instrumentation failures are
//! logged inside the core and swallowed.

use thiserror::Error;

use reqmeter_core::MetricsError;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("metrics: {0}")]
    Metrics(#[from] MetricsError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Stable code used in logs and tests.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "CONFIG",
            GatewayError::UnsupportedVersion(_) => "UNSUPPORTED_VERSION",
            GatewayError::Metrics(e) => e.code().as_str(),
            GatewayError::Io(_) => "IO",
            GatewayError::Logging(_) => "LOGGING",
            GatewayError::Http(_) => "HTTP",
        }
    }
}

//! `tracing-subscriber` setup driven by the `logging` config section.
//!
//! `RUST_LOG` overrides `logging.level`. With `format: json` each access
//! event becomes one JSON line carrying `timestamp` and the request fields,
//! which is the input format of `logstats`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingSection};
use crate::error::{GatewayError, Result};

pub fn init(cfg: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .map_err(|e| GatewayError::Logging(format!("bad level {:?}: {e}", cfg.level)))?;
    match (cfg.format, cfg.file.as_deref()) {
        (LogFormat::Text, None) => fmt().with_env_filter(filter).try_init().map_err(logging_err),
        (LogFormat::Json, None) => json_subscriber(filter, std::io::stdout)
            .try_init()
            .map_err(logging_err),
        (LogFormat::Text, Some(path)) => fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(open_append(path)?))
            .try_init()
            .map_err(logging_err),
        (LogFormat::Json, Some(path)) => json_subscriber(filter, Mutex::new(open_append(path)?))
            .try_init()
            .map_err(logging_err),
    }
}

fn logging_err(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Logging(e.to_string())
}

/// JSON-lines subscriber writing to `writer`. Each access event becomes one
/// line that `logstats::parse_line` reads back.
pub fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt().with_env_filter(filter).json().with_writer(writer).finish()
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Text logs on stderr, for subcommands that write data to stdout.
pub fn init_stderr(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| GatewayError::Logging(format!("bad level {level:?}: {e}")))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(logging_err)
}

//! Observability wiring for the gateway process.
//!
//! Metric storage and the access-log event live in `reqmeter_core`; this
//! module only installs the `tracing` subscriber that receives them.

pub mod logging;

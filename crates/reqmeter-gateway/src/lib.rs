//! reqmeter gateway library entry.
//!
//! Wires the metrics engine from `reqmeter_core` into an axum service:
//! strict YAML config, the request-tracking middleware, the scrape and
//! health endpoints, demo routes, and the offline access-log summarizer.
//! Consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod demo;
pub mod error;
pub mod logstats;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod router;

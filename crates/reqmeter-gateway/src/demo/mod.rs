//! Demo API routes and the workload simulator behind them.
//!
//! These routes exist to generate traffic for the metrics pipeline. Their
//! latency and failure behaviour come from a `Workload`, so tests can plug
//! in a deterministic one. The jitter constants are demo settings only.
//! `traffic` is the matching client side that drives them.

pub mod traffic;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::app_state::AppState;
use crate::config::DemoSection;

/// Source of simulated latency and failures for the demo routes.
pub trait Workload: Send + Sync {
    /// Delay to apply before answering.
    fn latency(&self) -> Duration;
    /// Whether this request should fail.
    fn should_fail(&self) -> bool;
}

/// Uniform jitter in `[0, max_latency]` plus a fixed failure probability.
pub struct JitterWorkload {
    max_latency_ms: u64,
    error_rate: f64,
    rng: Mutex<SmallRng>,
}

impl JitterWorkload {
    /// Seeded generator, reproducible across runs.
    pub fn new(max_latency_ms: u64, error_rate: f64, seed: u64) -> Self {
        Self::with_rng(max_latency_ms, error_rate, SmallRng::seed_from_u64(seed))
    }

    pub fn from_config(cfg: &DemoSection) -> Self {
        Self::with_rng(cfg.max_latency_ms, cfg.error_rate, SmallRng::from_entropy())
    }

    fn with_rng(max_latency_ms: u64, error_rate: f64, rng: SmallRng) -> Self {
        Self {
            max_latency_ms,
            // gen_bool rejects probabilities outside [0, 1].
            error_rate: if error_rate.is_nan() { 0.0 } else { error_rate.clamp(0.0, 1.0) },
            rng: Mutex::new(rng),
        }
    }

    fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Workload for JitterWorkload {
    fn latency(&self) -> Duration {
        Duration::from_millis(self.rng().gen_range(0..=self.max_latency_ms))
    }

    fn should_fail(&self) -> bool {
        self.rng().gen_bool(self.error_rate)
    }
}

/// Deterministic workload for tests and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWorkload {
    pub latency: Duration,
    pub fail: bool,
}

impl Workload for FixedWorkload {
    fn latency(&self) -> Duration {
        self.latency
    }

    fn should_fail(&self) -> bool {
        self.fail
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(get_user))
        .route("/api/order", post(post_order))
}

pub async fn get_user(State(app): State<AppState>) -> impl IntoResponse {
    let delay = simulate(app.workload()).await;
    tracing::info!(status = 200, response_time_ms = delay, "GET /api/user");
    (StatusCode::OK, "User data retrieved")
}

pub async fn post_order(State(app): State<AppState>) -> impl IntoResponse {
    let workload = app.workload();
    let delay = simulate(Arc::clone(&workload)).await;
    if workload.should_fail() {
        tracing::error!(status = 500, response_time_ms = delay, "POST /api/order failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Order failed")
    } else {
        tracing::info!(status = 200, response_time_ms = delay, "POST /api/order");
        (StatusCode::OK, "Order placed")
    }
}

/// Sleep for the workload's latency; returns it in milliseconds.
async fn simulate(workload: Arc<dyn Workload>) -> f64 {
    let delay = workload.latency();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    delay.as_secs_f64() * 1_000.0
}

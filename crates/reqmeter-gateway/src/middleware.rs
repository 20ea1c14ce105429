//! Request-tracking middleware.
//!
//! Every request gets an `InFlight` guard before the downstream service
//! runs. Completion is recorded exactly once:
//! - normal return: the response status;
//! - panic in a handler: `500`, then the panic keeps unwinding to the
//!   outer `CatchPanicLayer`;
//! - future dropped (client gone, timeout): the guard's `Drop` records `499`.
//!
//! The `path` label is the matched route template, never the raw URI, so
//! the series count is bounded by the route table. Requests that reach the
//! fallback share the single `unmatched` label.

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;

use reqmeter_core::instrument::STATUS_PANICKED;

use crate::app_state::AppState;

/// `path` label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

pub async fn track_requests(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, MatchedPath::as_str);
    let in_flight = app.request_metrics().start(req.method().as_str(), path);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => {
            in_flight.finish(resp.status().as_u16());
            resp
        }
        Err(panic) => {
            in_flight.finish(STATUS_PANICKED);
            std::panic::resume_unwind(panic)
        }
    }
}

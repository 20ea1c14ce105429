//! Axum router wiring.
//!
//! Layer order, outermost first: panic catcher, HTTP trace spans, request
//! tracking. The tracker therefore sees handler panics before they are
//! turned into a 500 response.

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::{app_state::AppState, demo, middleware, ops};

pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.cfg().metrics.path.clone();
    let mut routes = Router::new()
        .route("/healthz", get(ops::healthz))
        .route(&metrics_path, get(ops::metrics));
    if state.cfg().demo.enabled {
        routes = routes.merge(demo::routes());
    }
    instrument(routes, state)
}

/// Apply the tracking/trace/panic layers and attach state.
pub fn instrument(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(from_fn_with_state(state.clone(), middleware::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

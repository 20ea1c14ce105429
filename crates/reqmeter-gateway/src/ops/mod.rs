//! Operational HTTP endpoints.
//!
//! - `/healthz`        : liveness
//! - `<metrics.path>`  : Prometheus text format (scrape)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let (content_type, body) = state.registry().render_exposition();
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

//! End-to-end: requests through the router land in the scrape output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;

use reqmeter_core::{LabelSet, Registry};
use reqmeter_gateway::{
    app_state::AppState,
    config::GatewayConfig,
    demo::FixedWorkload,
    middleware::UNMATCHED_PATH,
    router::{build_router, instrument},
};

fn state(fail: bool) -> AppState {
    let workload = Arc::new(FixedWorkload {
        latency: Duration::ZERO,
        fail,
    });
    AppState::with_parts(GatewayConfig::default(), Arc::new(Registry::new()), workload).unwrap()
}

fn req(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn scrape(app: Router) -> (String, String) {
    let resp = app.oneshot(req(Method::GET, "/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (ct, String::from_utf8(body.to_vec()).unwrap())
}

fn labels(method: &str, path: &str, status: &str) -> LabelSet {
    LabelSet::new([("method", method), ("path", path), ("status", status)])
}

#[tokio::test]
async fn demo_traffic_is_counted_and_timed() {
    let st = state(false);
    let app = build_router(st.clone());

    for _ in 0..3 {
        let resp = app.clone().oneshot(req(Method::GET, "/api/user")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.clone().oneshot(req(Method::POST, "/api/order")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (ct, text) = scrape(app).await;
    assert_eq!(ct, "text/plain; version=0.0.4; charset=utf-8");
    assert!(text.contains("# TYPE http_requests_total counter\n"), "{text}");
    assert!(text.contains("# TYPE http_request_duration_ms histogram\n"), "{text}");
    assert!(
        text.contains("http_requests_total{method=\"GET\",path=\"/api/user\",status=\"200\"} 3\n"),
        "{text}"
    );
    assert!(
        text.contains("http_requests_total{method=\"POST\",path=\"/api/order\",status=\"200\"} 1\n"),
        "{text}"
    );
    assert!(
        text.contains("http_request_duration_ms_count{method=\"GET\",path=\"/api/user\",status=\"200\"} 3\n"),
        "{text}"
    );

    let hist = st.request_metrics().duration().get(&labels("GET", "/api/user", "200")).unwrap();
    assert_eq!(hist.count, 3);
}

#[tokio::test]
async fn failed_orders_record_500() {
    let st = state(true);
    let app = build_router(st.clone());
    let resp = app.oneshot(req(Method::POST, "/api/order")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        st.request_metrics().requests().get(&labels("POST", "/api/order", "500")),
        Some(1)
    );
}

#[tokio::test]
async fn unknown_routes_share_one_series() {
    let st = state(false);
    let app = build_router(st.clone());
    for i in 0..50 {
        let resp = app.clone().oneshot(req(Method::GET, &format!("/scan/{i}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    let m = st.request_metrics();
    assert_eq!(m.requests().get(&labels("GET", UNMATCHED_PATH, "404")), Some(50));
    assert_eq!(m.requests().get(&labels("GET", "/scan/0", "404")), None);

    let snap = st.registry().snapshot();
    assert_eq!(snap.family("http_requests_total").unwrap().samples.len(), 1);
    assert_eq!(snap.family("http_request_duration_ms").unwrap().samples.len(), 1);
}

#[tokio::test]
async fn path_label_is_the_route_template() {
    let st = state(false);
    let routes: Router<AppState> =
        Router::new().route("/items/:id", get(|| async { "item" }));
    let app = instrument(routes, st.clone());

    for id in ["1", "2", "abc"] {
        let resp = app.clone().oneshot(req(Method::GET, &format!("/items/{id}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(
        st.request_metrics().requests().get(&labels("GET", "/items/:id", "200")),
        Some(3)
    );
}

#[tokio::test]
async fn handler_panic_is_recorded_once_as_500() {
    let st = state(false);
    let routes: Router<AppState> =
        Router::new().route("/boom", get(|| async { panic!("handler exploded") as () }));
    let app = instrument(routes, st.clone());

    let resp = app.oneshot(req(Method::GET, "/boom")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let m = st.request_metrics();
    assert_eq!(m.requests().get(&labels("GET", "/boom", "500")), Some(1));
    assert_eq!(m.duration().get(&labels("GET", "/boom", "500")).unwrap().count, 1);
    assert_eq!(m.requests().get(&labels("GET", "/boom", "499")), None);
}

#[tokio::test]
async fn cancelled_request_is_recorded_once_as_499() {
    let st = state(false);
    let routes: Router<AppState> = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "late"
        }),
    );
    let app = instrument(routes, st.clone());

    let res = tokio::time::timeout(
        Duration::from_millis(20),
        app.oneshot(req(Method::GET, "/slow")),
    )
    .await;
    assert!(res.is_err(), "request should have timed out");

    let m = st.request_metrics();
    assert_eq!(m.requests().get(&labels("GET", "/slow", "499")), Some(1));
    assert_eq!(m.duration().get(&labels("GET", "/slow", "499")).unwrap().count, 1);
}

#[tokio::test]
async fn scrape_is_stable_without_traffic_in_between() {
    let st = state(false);
    let app = build_router(st.clone());
    app.clone().oneshot(req(Method::GET, "/api/user")).await.unwrap();

    // Scraping through the router records the scrape itself, so compare
    // the registry rendering directly.
    let (_, a) = st.registry().render_exposition();
    let (_, b) = st.registry().render_exposition();
    assert_eq!(a, b);
}

#[tokio::test]
async fn healthz_ok() {
    let app = build_router(state(false));
    let resp = app.oneshot(req(Method::GET, "/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn demo_routes_can_be_disabled() {
    let mut cfg = GatewayConfig::default();
    cfg.demo.enabled = false;
    let st = AppState::with_parts(cfg, Arc::new(Registry::new()), Arc::new(FixedWorkload::default()))
        .unwrap();
    let resp = build_router(st).oneshot(req(Method::GET, "/api/user")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn conflicting_metric_names_fail_startup() {
    let registry = Arc::new(Registry::new());
    registry.register_counter("http_request_duration_ms", "taken", &[]).unwrap();
    let err = AppState::with_parts(
        GatewayConfig::default(),
        registry,
        Arc::new(FixedWorkload::default()),
    )
    .err()
    .expect("must fail");
    assert_eq!(err.code(), "DUPLICATE_METRIC");
}

mod common;

use axum::http::{Method, StatusCode};
use common::build_test_app;

#[tokio::test]
async fn health_reports_store_and_connections() {
    let app = build_test_app();
    let (status, json) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["connections"], 0);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    use tower::ServiceExt;

    let app = build_test_app();
    let response = app
        .router
        .clone()
        .oneshot(common::build_request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn cors_exposes_the_request_id_to_the_web_app() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = build_test_app();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-request-id"));
}

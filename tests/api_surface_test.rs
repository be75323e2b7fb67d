mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn api_routes_require_a_session_token() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::GET, "/api/v1/products"),
        (Method::GET, "/api/v1/stock-movements"),
        (Method::GET, "/api/v1/clients"),
        (Method::GET, "/api/v1/appointments"),
        (Method::POST, "/api/v1/cash-flow/projection"),
    ] {
        let response = app.request(method.clone(), uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }

    let response = app
        .request(Method::GET, "/api/v1/products", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["data"]["checks"]["database"], "healthy");

    let doc = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(doc.status, StatusCode::OK);
    assert_eq!(doc.body["info"]["title"], "Clinic API");
    assert!(doc.body["paths"]["/api/v1/appointments/{id}/calendar-link"].is_object());
}

#[tokio::test]
async fn status_reports_service_and_environment() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/status").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["service"], "clinic-api");
    assert_eq!(response.body["data"]["environment"], "test");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/status").await;
    let meta_id = response.body["meta"]["request_id"].as_str();
    assert!(meta_id.is_some_and(|id| !id.is_empty()), "{}", response.body);
}

#[tokio::test]
async fn error_bodies_are_structured() {
    let app = TestApp::new().await;
    let response = app
        .get(&format!("/api/v1/products/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Not Found");
    assert!(response.body["message"].as_str().unwrap().contains("Product"));

    let response = app.post("/api/v1/products", json!({ "nome": 1 })).await;
    assert!(response.status.is_client_error());
}

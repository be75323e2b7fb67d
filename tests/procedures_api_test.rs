mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn categories_crud_and_active_filter() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/procedure-categories",
            json!({ "name": "Facial", "color": "#FF8800" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let facial = id_of(&response);
    let body = app
        .post("/api/v1/procedure-categories", json!({ "name": "Body" }))
        .await;
    let body = id_of(&body);

    let response = app
        .put(
            &format!("/api/v1/procedure-categories/{}", body),
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let all = app.get("/api/v1/procedure-categories").await;
    assert_eq!(all.body["data"].as_array().unwrap().len(), 2);
    let active = app
        .get("/api/v1/procedure-categories?active_only=true")
        .await;
    let active = active.body["data"].as_array().unwrap().clone();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], facial.to_string());

    let response = app
        .delete(&format!("/api/v1/procedure-categories/{}", body))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_color_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/procedure-categories",
            json!({ "name": "Laser", "color": "orange" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn procedures_filter_by_category_and_hide_inactive() {
    let app = TestApp::new().await;
    let facial = id_of(
        &app.post("/api/v1/procedure-categories", json!({ "name": "Facial" }))
            .await,
    );

    let response = app
        .post(
            "/api/v1/procedures",
            json!({ "name": "Peeling", "price": "250.00", "category_id": facial }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["data"]["duration_minutes"], 60);
    let peeling = id_of(&response);
    let botox = app.seed_procedure("Botox", "1200.00", 30).await;

    let response = app
        .get(&format!("/api/v1/procedures?category_id={}", facial))
        .await;
    let rows = response.body["data"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Peeling");

    app.put(
        &format!("/api/v1/procedures/{}", botox),
        json!({ "is_active": false }),
    )
    .await;
    let listed = app.get("/api/v1/procedures").await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 1);
    let listed = app.get("/api/v1/procedures?active_only=false").await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 2);

    // Deleting the category leaves its procedures uncategorized.
    app.delete(&format!("/api/v1/procedure-categories/{}", facial))
        .await;
    let response = app.get(&format!("/api/v1/procedures/{}", peeling)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"]["category_id"].is_null());
}

#[tokio::test]
async fn duration_bounds_and_unknown_category_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/procedures",
            json!({ "name": "Too quick", "price": "10", "duration_minutes": 5 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/procedures",
            json!({ "name": "Orphan", "price": "10", "category_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booked_procedure_cannot_be_deleted() {
    let app = TestApp::new().await;
    let client = app.seed_client("Booked Client").await;
    let procedure = app.seed_procedure("Microneedling", "600.00", 60).await;
    let response = app
        .post(
            "/api/v1/appointments",
            json!({ "client_id": client, "procedure_id": procedure, "scheduled_at": "2026-03-10T14:00:00Z" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app.delete(&format!("/api/v1/procedures/{}", procedure)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let unused = app.seed_procedure("Unused", "10.00", 30).await;
    let response = app.delete(&format!("/api/v1/procedures/{}", unused)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

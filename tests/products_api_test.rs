mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use common::{decimal, id_of, TestApp};

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "  Sunscreen  ", "sku": "SUN-50", "category": "retail" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let id = id_of(&response);
    assert_eq!(response.body["data"]["name"], "Sunscreen");
    assert_eq!(response.body["data"]["unit"], "un");
    assert_eq!(response.body["data"]["is_active"], true);

    let response = app
        .put(
            &format!("/api/v1/products/{}", id),
            json!({ "min_stock": "4", "cost_price": "32.90" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(decimal(&response.body["data"]["min_stock"]), Decimal::from(4));

    let response = app
        .post(&format!("/api/v1/products/{}/toggle", id), json!({}))
        .await;
    assert_eq!(response.body["data"]["is_active"], false);

    let response = app.delete(&format!("/api/v1/products/{}", id)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app.get(&format!("/api/v1/products/{}", id)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_name_and_negative_prices_are_rejected() {
    let app = TestApp::new().await;

    let response = app.post("/api/v1/products", json!({ "name": "   " })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/v1/products", json!({ "name": "Serum", "cost_price": "-1" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "Old stock", "expiry_date": "2001-01-01" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stocked_product_cannot_be_deleted() {
    let app = TestApp::new().await;
    let product = app.seed_product("Botox", "3", "1").await;

    let response = app.delete(&format!("/api/v1/products/{}", product)).await;
    assert_eq!(response.status, StatusCode::CONFLICT, "{}", response.body);

    app.record_movement(product, "out", "3").await;
    let response = app.delete(&format!("/api/v1/products/{}", product)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn availability_reports_shortfall() {
    let app = TestApp::new().await;
    let product = app.seed_product("Thread lift kit", "4", "1").await;

    let response = app
        .get(&format!("/api/v1/products/{}/availability?quantity=4", product))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["is_valid"], true);

    let response = app
        .get(&format!("/api/v1/products/{}/availability?quantity=5", product))
        .await;
    assert_eq!(response.body["data"]["is_valid"], false);
    assert_eq!(decimal(&response.body["data"]["available_stock"]), Decimal::from(4));
    assert!(response.body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("insufficient"));
}

#[tokio::test]
async fn alerts_cover_low_stock_and_expiry() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();

    app.seed_product("Low", "1", "5").await;
    // Past expiry dates are refused on create, so age the product afterwards.
    let expired = app.seed_product("Expired", "10", "1").await;
    let response = app
        .put(
            &format!("/api/v1/products/{}", expired),
            json!({ "expiry_date": today - Duration::days(2) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    app.post(
        "/api/v1/products",
        json!({
            "name": "Expiring",
            "current_stock": "10",
            "min_stock": "1",
            "expiry_date": today + Duration::days(5),
        }),
    )
    .await;
    app.seed_product("Healthy", "50", "5").await;

    let response = app.get("/api/v1/products/alerts").await;
    assert_eq!(response.status, StatusCode::OK);
    let alerts = response.body["data"].as_array().unwrap();
    let kinds: Vec<(&str, &str)> = alerts
        .iter()
        .map(|a| (a["product_name"].as_str().unwrap(), a["kind"].as_str().unwrap()))
        .collect();
    assert!(kinds.contains(&("Low", "low_stock")));
    assert!(kinds.contains(&("Expired", "expired")));
    assert!(kinds.contains(&("Expiring", "expiring_soon")));
    assert!(kinds.iter().all(|(name, _)| *name != "Healthy"));

    let summary = app.get("/api/v1/products/summary").await;
    let s = &summary.body["data"];
    assert_eq!(s["total_products"], 4);
    assert_eq!(s["low_stock_count"], 1);
    assert_eq!(s["expired_count"], 1);
    assert_eq!(s["expiring_soon_count"], 1);
}

#[tokio::test]
async fn valuation_groups_by_category() {
    let app = TestApp::new().await;
    for (name, category, stock, cost) in [
        ("A", Some("injectables"), "2", "100"),
        ("B", Some("injectables"), "3", "10"),
        ("C", None, "4", "5"),
    ] {
        let response = app
            .post(
                "/api/v1/products",
                json!({ "name": name, "category": category, "current_stock": stock, "cost_price": cost }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app.get("/api/v1/products/valuation").await;
    let v = &response.body["data"];
    assert_eq!(decimal(&v["total_value"]), Decimal::from(250));
    assert_eq!(decimal(&v["total_quantity"]), Decimal::from(9));
    let injectables = &v["products_by_category"]["injectables"];
    assert_eq!(decimal(&injectables["total_value"]), Decimal::from(230));
    assert_eq!(injectables["product_count"], 2);
    assert_eq!(v["products_by_category"]["Uncategorized"]["product_count"], 1);
}

#[tokio::test]
async fn list_filters_low_stock_and_reports_categories() {
    let app = TestApp::new().await;
    app.seed_product("Low", "1", "2").await;
    app.seed_product("Fine", "10", "2").await;

    let response = app.get("/api/v1/products?low_stock=true").await;
    assert_eq!(response.body["pagination"]["total"], 1);
    assert_eq!(response.body["data"][0]["name"], "Low");

    let response = app.get("/api/v1/products/categories").await;
    assert_eq!(response.body["data"], json!(["injectables"]));
}

#[tokio::test]
async fn recent_movements_are_newest_first_and_limited() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cotton", "0", "0").await;
    for qty in ["1", "2", "3"] {
        app.record_movement(product, "in", qty).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = app
        .get(&format!("/api/v1/products/{}/movements?limit=2", product))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let rows = response.body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(decimal(&rows[0]["quantity"]), Decimal::from(3));
}

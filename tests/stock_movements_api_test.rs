mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use clinic_api::entities::{stock_movement, StockMovement};

use common::{decimal, id_of, TestApp};

async fn product_stock(app: &TestApp, product_id: uuid::Uuid) -> Decimal {
    let response = app.get(&format!("/api/v1/products/{}", product_id)).await;
    assert_eq!(response.status, StatusCode::OK);
    decimal(&response.body["data"]["current_stock"])
}

fn created_at(response: &common::TestResponse) -> DateTime<Utc> {
    response.body["data"]["created_at"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("no created_at in {}", response.body))
}

fn query_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

async fn movement_total(app: &TestApp, query: &str) -> u64 {
    let response = app.get(&format!("/api/v1/stock-movements?{}", query)).await;
    assert_eq!(response.status, StatusCode::OK, "{} {}", query, response.body);
    response.body["pagination"]["total"].as_u64().unwrap_or_default()
}

#[tokio::test]
async fn recording_movements_keeps_product_stock_in_step() {
    let app = TestApp::new().await;
    let product = app.seed_product("Botox 100U", "5", "2").await;

    let response = app.record_movement(product, "in", "10").await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let data = &response.body["data"];
    assert_eq!(data["movement_type"], "in");
    assert_eq!(decimal(&data["previous_stock"]), Decimal::from(5));
    assert_eq!(decimal(&data["new_stock"]), Decimal::from(15));

    let response = app.record_movement(product, "out", "4").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(product_stock(&app, product).await, Decimal::from(11));

    // Adjustments record the counted level.
    let response = app.record_movement(product, "adjustment", "7").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(decimal(&response.body["data"]["previous_stock"]), Decimal::from(11));
    assert_eq!(product_stock(&app, product).await, Decimal::from(7));
}

#[tokio::test]
async fn outflow_beyond_stock_is_rejected_and_nothing_is_written() {
    let app = TestApp::new().await;
    let product = app.seed_product("Hyaluronic acid", "2", "0").await;

    let response = app.record_movement(product, "out", "3").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", response.body);

    assert_eq!(product_stock(&app, product).await, Decimal::from(2));
    let listed = app.get("/api/v1/stock-movements").await;
    assert_eq!(listed.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Gauze", "10", "0").await;

    for movement_type in ["in", "out", "loss", "expired"] {
        let response = app.record_movement(product, movement_type, "0").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", movement_type);
    }
    let response = app.record_movement(product, "adjustment", "-1").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.record_movement(product, "adjustment", "0").await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn movement_for_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let response = app.record_movement(uuid::Uuid::new_v4(), "in", "1").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_movement_removes_exactly_one_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("Lidocaine", "0", "0").await;
    let mut ids = Vec::new();
    for qty in ["3", "4", "5"] {
        let response = app.record_movement(product, "in", qty).await;
        ids.push(id_of(&response));
    }

    let before = app.get("/api/v1/stock-movements").await;
    assert_eq!(before.body["pagination"]["total"], 3);

    let response = app
        .delete(&format!(
            "/api/v1/stock-movements/{}?reverse_stock=false",
            ids[1]
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["stock_reversed"], false);

    let after = app.get("/api/v1/stock-movements").await;
    assert_eq!(after.body["pagination"]["total"], 2);
    let remaining: Vec<&str> = after.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert!(!remaining.contains(&ids[1].to_string().as_str()));

    let rows = StockMovement::find()
        .filter(stock_movement::Column::ProductId.eq(product))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(rows, 2);

    // Stock is untouched without reversal.
    assert_eq!(product_stock(&app, product).await, Decimal::from(12));

    let again = app
        .delete(&format!("/api/v1/stock-movements/{}", ids[1]))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reverse_stock_restores_the_product_level() {
    let app = TestApp::new().await;
    let product = app.seed_product("Needles", "10", "0").await;
    let out = id_of(&app.record_movement(product, "out", "4").await);
    assert_eq!(product_stock(&app, product).await, Decimal::from(6));

    let response = app
        .delete(&format!("/api/v1/stock-movements/{}?reverse_stock=true", out))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["stock_reversed"], true);
    assert_eq!(decimal(&response.body["data"]["product_stock"]), Decimal::from(10));
    assert_eq!(product_stock(&app, product).await, Decimal::from(10));
}

#[tokio::test]
async fn delete_reverses_stock_when_the_request_is_silent() {
    let app = TestApp::new().await;
    let product = app.seed_product("Syringes", "0", "0").await;
    let movement = id_of(&app.record_movement(product, "in", "8").await);
    app.record_movement(product, "out", "3").await;

    let response = app
        .delete(&format!("/api/v1/stock-movements/{}", movement))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["stock_reversed"], true);
    assert_eq!(product_stock(&app, product).await, Decimal::ZERO);
}

#[tokio::test]
async fn configured_default_can_keep_stock_on_delete() {
    let app = TestApp::with_config(|cfg| cfg.reverse_stock_on_delete = false).await;
    let product = app.seed_product("Gauze", "0", "0").await;
    let movement = id_of(&app.record_movement(product, "in", "8").await);

    let response = app
        .delete(&format!("/api/v1/stock-movements/{}", movement))
        .await;
    assert_eq!(response.body["data"]["stock_reversed"], false);
    assert_eq!(product_stock(&app, product).await, Decimal::from(8));
}

#[tokio::test]
async fn summary_totals_by_type_and_excludes_adjustments_from_net() {
    let app = TestApp::new().await;
    let product = app.seed_product("Filler", "0", "0").await;
    for (t, q) in [("in", "10"), ("out", "3"), ("loss", "1"), ("expired", "2"), ("adjustment", "20")] {
        let response = app.record_movement(product, t, q).await;
        assert_eq!(response.status, StatusCode::CREATED, "{} {}", t, response.body);
    }

    let response = app.get("/api/v1/stock-movements/summary").await;
    assert_eq!(response.status, StatusCode::OK);
    let s = &response.body["data"];
    assert_eq!(decimal(&s["total_in"]), Decimal::from(10));
    assert_eq!(decimal(&s["total_out"]), Decimal::from(3));
    assert_eq!(decimal(&s["total_loss"]), Decimal::from(1));
    assert_eq!(decimal(&s["total_expired"]), Decimal::from(2));
    assert_eq!(decimal(&s["total_adjustments"]), Decimal::from(20));
    assert_eq!(decimal(&s["net_movement"]), Decimal::from(4));
    assert_eq!(s["movement_count"], 5);
    assert_eq!(s["movements_by_type"]["in"], 1);
    assert_eq!(s["movements_by_type"]["adjustment"], 1);
}

#[tokio::test]
async fn list_filters_by_product_with_either_parameter_spelling() {
    let app = TestApp::new().await;
    let first = app.seed_product("Product A", "0", "0").await;
    let second = app.seed_product("Product B", "0", "0").await;
    app.record_movement(first, "in", "1").await;
    app.record_movement(first, "in", "2").await;
    app.record_movement(second, "in", "3").await;

    for param in ["product_id", "productId"] {
        let response = app
            .get(&format!("/api/v1/stock-movements?{}={}", param, first))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["pagination"]["total"], 2, "{}", param);
        for row in response.body["data"].as_array().unwrap() {
            assert_eq!(row["product_name"], "Product A");
        }
    }

    let by_type = app
        .get("/api/v1/stock-movements?movement_type=in&per_page=1&page=2")
        .await;
    assert_eq!(by_type.body["pagination"]["total"], 3);
    assert_eq!(by_type.body["pagination"]["total_pages"], 3);
    assert_eq!(by_type.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn movements_are_invisible_to_other_accounts() {
    let app = TestApp::new().await;
    let product = app.seed_product("Private", "0", "0").await;
    let movement = id_of(&app.record_movement(product, "in", "1").await);
    let other = app.other_account_token();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/stock-movements/{}", movement),
            None,
            Some(&other),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listed = app
        .request(Method::GET, "/api/v1/stock-movements", None, Some(&other))
        .await;
    assert_matches!(listed.body["pagination"]["total"].as_u64(), Some(0));
}

#[tokio::test]
async fn search_matches_names_and_notes_literally() {
    let app = TestApp::new().await;
    let acid = app.seed_product("Ácido hialurônico", "0", "0").await;
    let gloves = app.seed_product("Luvas", "0", "0").await;
    let serum = app.seed_product("Serum_50", "0", "0").await;
    app.record_movement(acid, "in", "2").await;
    app.record_movement(serum, "in", "1").await;
    let response = app
        .post(
            "/api/v1/stock-movements",
            json!({ "product_id": gloves, "movement_type": "in", "quantity": "5", "notes": "100% descartáveis" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    assert_eq!(movement_total(&app, "search=%C3%A1cido").await, 1);
    assert_eq!(movement_total(&app, "search=HIALUR%C3%94NICO").await, 1);
    assert_eq!(movement_total(&app, "search=luvas").await, 1);
    assert_eq!(movement_total(&app, "search=descart%C3%A1veis").await, 1);
    // LIKE wildcards in the term are plain characters.
    assert_eq!(movement_total(&app, "search=%25").await, 1);
    assert_eq!(movement_total(&app, "search=_").await, 1);
    assert_eq!(movement_total(&app, "search=nothing").await, 0);
}

#[tokio::test]
async fn reference_type_filter_narrows_the_list() {
    let app = TestApp::new().await;
    let product = app.seed_product("Anesthetic cream", "10", "0").await;
    app.record_movement(product, "out", "1").await;
    let response = app
        .post(
            "/api/v1/stock-movements",
            json!({
                "product_id": product,
                "movement_type": "out",
                "quantity": "2",
                "reference_type": "appointment",
                "reference_id": "apt-42",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    assert_eq!(movement_total(&app, "reference_type=appointment").await, 1);
    assert_eq!(movement_total(&app, "reference_id=apt-42").await, 1);
    assert_eq!(movement_total(&app, "reference_type=purchase").await, 0);
}

#[tokio::test]
async fn date_window_is_half_open_in_list_and_summary() {
    let app = TestApp::new().await;
    let product = app.seed_product("Masks", "0", "0").await;
    let first = app.record_movement(product, "in", "5").await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = app.record_movement(product, "in", "3").await;
    let (t1, t2) = (query_time(created_at(&first)), query_time(created_at(&second)));

    let window = |from: &str, to: &str| {
        format!("from={}&to={}", urlencode(from), urlencode(to))
    };
    assert_eq!(movement_total(&app, &format!("to={}", urlencode(&t2))).await, 1);
    assert_eq!(movement_total(&app, &format!("from={}", urlencode(&t2))).await, 1);
    assert_eq!(movement_total(&app, &window(&t1, &t1)).await, 0);
    assert_eq!(movement_total(&app, &window(&t1, &t2)).await, 1);

    let response = app
        .get(&format!("/api/v1/stock-movements/summary?from={}", urlencode(&t2)))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(decimal(&response.body["data"]["total_in"]), Decimal::from(3));
    assert_eq!(response.body["data"]["movement_count"], 1);

    let response = app
        .get(&format!("/api/v1/stock-movements/summary?{}", window(&t1, &t2)))
        .await;
    assert_eq!(decimal(&response.body["data"]["total_in"]), Decimal::from(5));
}

fn urlencode(raw: &str) -> String {
    raw.replace('+', "%2B").replace(':', "%3A")
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let app = TestApp::new().await;
    let product = app.seed_product("Gloves", "0", "0").await;
    app.record_movement(product, "in", "1").await;

    let response = app
        .get("/api/v1/stock-movements?page=18446744073709551615")
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["pagination"]["total"], 1);
    assert!(response.body["data"].as_array().unwrap().is_empty());

    for uri in ["/api/v1/products", "/api/v1/clients", "/api/v1/appointments"] {
        let response = app
            .get(&format!("{}?page=18446744073709551615", uri))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{} {}", uri, response.body);
    }
}

#[tokio::test]
async fn inflows_past_the_stock_limit_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Saline", "0", "0").await;

    let response = app
        .record_movement(product, "in", "70000000000000000000000000000")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);

    let response = app.record_movement(product, "in", "1000000000000").await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let response = app.record_movement(product, "in", "1000000000000").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    assert_eq!(product_stock(&app, product).await, Decimal::from(1_000_000_000_000u64));
}

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{decimal, id_of, TestApp};

async fn create_campaign(app: &TestApp, body: Value) -> Uuid {
    let response = app.post("/api/v1/campaigns", body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    id_of(&response)
}

fn names(audience: &Value) -> Vec<String> {
    audience["data"]["clients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

/// A birth date whose next anniversary is `days` from today.
fn born_days_ahead(days: i64) -> NaiveDate {
    let target = Utc::now().date_naive() + Duration::days(days);
    NaiveDate::from_ymd_opt(1992, target.month(), target.day()).unwrap()
}

#[tokio::test]
async fn campaign_starts_as_draft_and_reports_performance() {
    let app = TestApp::new().await;
    let id = create_campaign(
        &app,
        json!({
            "name": "Summer peel",
            "campaign_type": "whatsapp",
            "target_type": "all_clients",
            "cost": "300.00",
        }),
    )
    .await;

    let response = app.get(&format!("/api/v1/campaigns/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status"], "draft");
    assert_eq!(data["trigger_type"], "manual");
    assert_eq!(decimal(&data["performance"]["open_rate"]), dec!(0));

    let response = app
        .put(
            &format!("/api/v1/campaigns/{}", id),
            json!({
                "target_count": 200,
                "sent_count": 200,
                "opened_count": 80,
                "clicked_count": 20,
                "converted_count": 6,
                "revenue_generated": "1800.00",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let performance = app.get(&format!("/api/v1/campaigns/{}", id)).await.body["data"]
        ["performance"]
        .clone();
    assert_eq!(decimal(&performance["open_rate"]), dec!(40));
    assert_eq!(decimal(&performance["click_rate"]), dec!(25));
    assert_eq!(decimal(&performance["conversion_rate"]), dec!(3));
    assert_eq!(decimal(&performance["roi"]), dec!(6));
}

#[tokio::test]
async fn status_changes_stamp_times_and_finished_campaigns_stay_put() {
    let app = TestApp::new().await;
    let id = create_campaign(
        &app,
        json!({ "name": "Botox week", "campaign_type": "email", "target_type": "all_clients" }),
    )
    .await;
    let status_uri = format!("/api/v1/campaigns/{}/status", id);

    let response = app.put(&status_uri, json!({ "status": "active" })).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.body["data"]["started_at"].is_string());
    assert!(response.body["data"]["completed_at"].is_null());

    let response = app.put(&status_uri, json!({ "status": "completed" })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"]["completed_at"].is_string());

    let response = app.put(&status_uri, json!({ "status": "completed" })).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.put(&status_uri, json!({ "status": "active" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn targets_must_name_their_audience() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/campaigns",
            json!({ "name": "VIP night", "campaign_type": "sms", "target_type": "segment" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/campaigns",
            json!({ "name": "Picked", "campaign_type": "sms", "target_type": "custom_list" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/campaigns",
            json!({
                "name": "Picked",
                "campaign_type": "sms",
                "target_type": "custom_list",
                "target_client_ids": [],
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/campaigns",
            json!({ "name": "Costly", "campaign_type": "sms", "target_type": "all_clients", "cost": "-1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_is_a_fresh_draft() {
    let app = TestApp::new().await;
    let id = create_campaign(
        &app,
        json!({
            "name": "Laser promo",
            "campaign_type": "whatsapp",
            "target_type": "segment",
            "target_segment": "vip",
            "content": { "message": "Hi!" },
        }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}", id),
        json!({ "sent_count": 50, "revenue_generated": "900" }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}/status", id),
        json!({ "status": "active" }),
    )
    .await;

    let response = app
        .post(&format!("/api/v1/campaigns/{}/duplicate", id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let copy = &response.body["data"];
    assert_ne!(copy["id"], id.to_string());
    assert_eq!(copy["name"], "Laser promo (copy)");
    assert_eq!(copy["status"], "draft");
    assert_eq!(copy["sent_count"], 0);
    assert_eq!(decimal(&copy["revenue_generated"]), dec!(0));
    assert!(copy["started_at"].is_null());
    assert_eq!(copy["target_segment"], "vip");
    assert_eq!(copy["content"]["message"], "Hi!");

    let response = app
        .post(
            &format!("/api/v1/campaigns/{}/duplicate", id),
            json!({ "name": "Laser promo II" }),
        )
        .await;
    assert_eq!(response.body["data"]["name"], "Laser promo II");
}

#[tokio::test]
async fn list_filters_and_account_scoping() {
    let app = TestApp::new().await;
    let promo = create_campaign(
        &app,
        json!({
            "name": "Promoção de ácido",
            "description": "Hialurônico em dobro",
            "campaign_type": "whatsapp",
            "target_type": "segment",
            "target_segment": "vip",
        }),
    )
    .await;
    create_campaign(
        &app,
        json!({ "name": "Newsletter", "campaign_type": "email", "target_type": "all_clients" }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}/status", promo),
        json!({ "status": "active" }),
    )
    .await;

    let total = |r: &common::TestResponse| r.body["pagination"]["total"].as_u64().unwrap();
    assert_eq!(total(&app.get("/api/v1/campaigns").await), 2);
    assert_eq!(total(&app.get("/api/v1/campaigns?status=active").await), 1);
    assert_eq!(total(&app.get("/api/v1/campaigns?campaign_type=email").await), 1);
    assert_eq!(total(&app.get("/api/v1/campaigns?target_segment=vip").await), 1);
    assert_eq!(total(&app.get("/api/v1/campaigns?search=HIALUR%C3%94NICO").await), 1);
    assert_eq!(total(&app.get("/api/v1/campaigns?search=%C3%81CIDO").await), 1);

    let other = app.other_account_token();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/campaigns/{}", promo),
            None,
            Some(&other),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.delete(&format!("/api/v1/campaigns/{}", promo)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = app.get(&format!("/api/v1/campaigns/{}", promo)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audience_follows_the_campaign_target() {
    let app = TestApp::new().await;
    let ana = app.seed_client("Ana").await;
    let bia = app.seed_client("Bia").await;
    let caio = app.seed_client("Caio").await;
    app.put(&format!("/api/v1/clients/{}", ana), json!({ "segment": "vip" }))
        .await;
    app.put(
        &format!("/api/v1/clients/{}", caio),
        json!({ "segment": "vip", "status": "inactive" }),
    )
    .await;

    let vip = create_campaign(
        &app,
        json!({ "name": "VIP", "campaign_type": "sms", "target_type": "segment", "target_segment": "vip" }),
    )
    .await;
    let audience = app.get(&format!("/api/v1/campaigns/{}/audience", vip)).await;
    assert_eq!(audience.status, StatusCode::OK, "{}", audience.body);
    assert_eq!(audience.body["data"]["kind"], "segment");
    assert_eq!(names(&audience.body), ["Ana"]);

    let listed = create_campaign(
        &app,
        json!({
            "name": "Picked",
            "campaign_type": "whatsapp",
            "target_type": "custom_list",
            "target_client_ids": [bia, caio],
        }),
    )
    .await;
    let audience = app
        .get(&format!("/api/v1/campaigns/{}/audience", listed))
        .await;
    assert_eq!(names(&audience.body), ["Bia"]);

    let everyone = create_campaign(
        &app,
        json!({ "name": "All", "campaign_type": "email", "target_type": "all_clients" }),
    )
    .await;
    let audience = app
        .get(&format!("/api/v1/campaigns/{}/audience", everyone))
        .await;
    assert_eq!(audience.body["data"]["client_count"], 2);
}

#[tokio::test]
async fn birthday_campaigns_reach_upcoming_birthdays() {
    let app = TestApp::new().await;
    let soon = app.seed_client("Soon").await;
    let later = app.seed_client("Later").await;
    app.put(
        &format!("/api/v1/clients/{}", soon),
        json!({ "birthday": born_days_ahead(3) }),
    )
    .await;
    app.put(
        &format!("/api/v1/clients/{}", later),
        json!({ "birthday": born_days_ahead(60) }),
    )
    .await;

    let id = create_campaign(
        &app,
        json!({ "name": "Parabéns", "campaign_type": "birthday", "target_type": "all_clients" }),
    )
    .await;
    let audience = app.get(&format!("/api/v1/campaigns/{}/audience", id)).await;
    assert_eq!(audience.body["data"]["kind"], "birthdays");
    assert_eq!(names(&audience.body), ["Soon"]);

    let preview = app
        .get("/api/v1/campaigns/targeting?birthdays_within_days=90")
        .await;
    assert_eq!(preview.status, StatusCode::OK);
    assert_eq!(names(&preview.body), ["Soon", "Later"]);

    let response = app
        .get("/api/v1/campaigns/targeting?segment=vip&birthdays_within_days=10")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let response = app
        .get("/api/v1/campaigns/targeting?birthdays_within_days=400")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let preview = app.get("/api/v1/campaigns/targeting").await;
    assert_eq!(preview.body["data"]["kind"], "all_clients");
    assert_eq!(preview.body["data"]["client_count"], 2);
}

#[tokio::test]
async fn report_aggregates_every_campaign() {
    let app = TestApp::new().await;
    let first = create_campaign(
        &app,
        json!({ "name": "A", "campaign_type": "email", "target_type": "all_clients", "cost": "200" }),
    )
    .await;
    let second = create_campaign(
        &app,
        json!({ "name": "B", "campaign_type": "sms", "target_type": "all_clients", "cost": "100" }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}", first),
        json!({ "sent_count": 100, "opened_count": 50, "clicked_count": 10, "converted_count": 5, "revenue_generated": "600" }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}", second),
        json!({ "sent_count": 100, "opened_count": 10, "clicked_count": 5, "converted_count": 1, "revenue_generated": "300" }),
    )
    .await;
    app.put(
        &format!("/api/v1/campaigns/{}/status", first),
        json!({ "status": "active" }),
    )
    .await;

    let response = app.get("/api/v1/campaigns/report").await;
    assert_eq!(response.status, StatusCode::OK);
    let report = &response.body["data"];
    assert_eq!(report["total_campaigns"], 2);
    assert_eq!(report["active_campaigns"], 1);
    assert_eq!(report["total_sent"], 200);
    assert_eq!(decimal(&report["total_revenue"]), dec!(900));
    assert_eq!(decimal(&report["avg_open_rate"]), dec!(30));
    assert_eq!(decimal(&report["avg_click_rate"]), dec!(25));
    assert_eq!(decimal(&report["avg_conversion_rate"]), dec!(3));
    assert_eq!(decimal(&report["avg_roi"]), dec!(3));
}

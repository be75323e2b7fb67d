#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use clinic_api::{
    auth::{AuthConfig, Session, SessionVerifier},
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: Uuid,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh schema per app; `tweak` adjusts the configuration first.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.autosave_delay_ms = 50;
        tweak(&mut cfg);

        // One connection: every connection to sqlite::memory: is its own database.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            ..Default::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));

        let user_id = Uuid::new_v4();
        let token = state
            .sessions
            .issue_token(user_id)
            .expect("issue test token");

        Self {
            router: clinic_api::build_router(state.clone()),
            state,
            user_id,
            token,
            _event_task: event_task,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn session(&self) -> Session {
        Session::new(self.user_id)
    }

    /// Token for a different clinic account.
    pub fn other_account_token(&self) -> String {
        SessionVerifier::new(AuthConfig::from_app_config(&self.state.config))
            .issue_token(Uuid::new_v4())
            .expect("issue second token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, Some(self.token())).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), Some(self.token()))
            .await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), Some(self.token()))
            .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, Some(self.token()))
            .await
    }

    pub async fn seed_product(&self, name: &str, stock: &str, min_stock: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/products",
                json!({
                    "name": name,
                    "category": "injectables",
                    "cost_price": "10.00",
                    "current_stock": stock,
                    "min_stock": min_stock,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response)
    }

    pub async fn record_movement(&self, product_id: Uuid, movement_type: &str, quantity: &str) -> TestResponse {
        self.post(
            "/api/v1/stock-movements",
            json!({
                "product_id": product_id,
                "movement_type": movement_type,
                "quantity": quantity,
            }),
        )
        .await
    }

    pub async fn seed_client(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/clients",
                json!({ "name": name, "phone": "(11) 98765-4321" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response)
    }

    pub async fn seed_procedure(&self, name: &str, price: &str, duration_minutes: i32) -> Uuid {
        let response = self
            .post(
                "/api/v1/procedures",
                json!({ "name": name, "price": price, "duration_minutes": duration_minutes }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id_of(&response)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn id_of(response: &TestResponse) -> Uuid {
    response.body["data"]["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("response has no data.id: {}", response.body))
}

/// Decimal fields serialize as strings; compare them numerically.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap_or_else(|_| panic!("not a decimal: {}", s)),
        Value::Number(n) => n.to_string().parse().unwrap_or_else(|_| panic!("not a decimal: {}", n)),
        other => panic!("not a decimal: {}", other),
    }
}

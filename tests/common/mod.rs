#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbBackend, EntityTrait, Set, Statement};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use order_orchestrator::{
    config::AppConfig,
    db,
    entities::item,
    errors::ServiceError,
    services::user_directory::UserDirectory,
    AppState,
};

/// In-process user directory: knows a fixed set of users, or is "down".
pub struct StubUserDirectory {
    known: HashSet<i32>,
    available: bool,
}

impl StubUserDirectory {
    pub fn with_users(users: &[i32]) -> Self {
        Self {
            known: users.iter().copied().collect(),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            known: HashSet::new(),
            available: false,
        }
    }
}

#[async_trait]
impl UserDirectory for StubUserDirectory {
    async fn user_exists(&self, user_id: i32) -> Result<bool, ServiceError> {
        if !self.available {
            return Err(ServiceError::UpstreamUnavailable("User directory".into()));
        }
        Ok(self.known.contains(&user_id))
    }
}

pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// Helper harness for spinning up the router backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: Option<TempDir>,
}

impl TestApp {
    /// App whose directory knows users 1 and 2
    pub async fn new() -> Self {
        Self::build(StubUserDirectory::with_users(&[1, 2]), None, None).await
    }

    pub async fn with_directory(users: StubUserDirectory) -> Self {
        Self::build(users, None, None).await
    }

    pub async fn with_gateway(credentials: &str) -> Self {
        Self::build(StubUserDirectory::with_users(&[1, 2]), Some(credentials), None).await
    }

    /// App on a SQLite file in a temp dir, configured like a deployment
    /// with a pool of `max_connections`.
    pub async fn file_backed(max_connections: u32) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        Self::build(
            StubUserDirectory::with_users(&[1, 2]),
            None,
            Some((dir, max_connections)),
        )
        .await
    }

    async fn build(
        users: StubUserDirectory,
        gateway: Option<&str>,
        file: Option<(TempDir, u32)>,
    ) -> Self {
        let database_url = match &file {
            Some((dir, _)) => format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("orders.db").display()
            ),
            None => "sqlite::memory:".to_string(),
        };
        let mut cfg = AppConfig::new(
            database_url,
            "http://127.0.0.1:5001".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every request on the same in-memory database
        // and serializes transactions.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        if let Some((_, max_connections)) = &file {
            cfg.db_max_connections = *max_connections;
        }
        cfg.gateway_credentials = gateway.map(str::to_string);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg, Arc::new(users))
            .expect("failed to build test state");
        let router = order_orchestrator::app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: file.map(|(dir, _)| dir),
        }
    }

    pub async fn seed_item(&self, name: &str, quantity: i32, price: Decimal) -> i32 {
        item::ActiveModel {
            name: Set(name.to_string()),
            quantity: Set(quantity),
            price: Set(price),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed item for tests")
        .id
    }

    pub async fn item_quantity(&self, id: i32) -> i32 {
        item::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load item")
            .expect("item exists")
            .quantity
    }

    pub async fn set_item_price(&self, id: i32, price: Decimal) {
        let mut model: item::ActiveModel = item::Entity::find_by_id(id)
            .one(self.state.db.as_ref())
            .await
            .expect("load item")
            .expect("item exists")
            .into();
        model.price = Set(price);
        model
            .update(self.state.db.as_ref())
            .await
            .expect("update item price");
    }

    pub async fn execute_sql(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("execute sql");
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let row = self
            .state
            .db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {}", table),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get("", "n").expect("count column")
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request against the router with optional JSON body and headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Body>,
        headers: &[(&str, String)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }
        let body = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                body
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let body = body.map(|json| {
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        });
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn post_order(&self, body: Value) -> TestResponse {
        self.request(Method::POST, "/orders", Some(body)).await
    }
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", user, password))
    )
}

/// Prices round-trip through SQLite as floating point; compare at cents.
pub fn price_of(value: &Value) -> Decimal {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    raw.parse::<Decimal>().expect("decimal price").round_dp(2)
}

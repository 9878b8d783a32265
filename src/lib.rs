//! Order Orchestrator library
//!
//! Places orders against a shared inventory: the user is verified with a
//! remote directory, then every line is reserved and the order stored inside
//! one database transaction.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, GatewayCredentials};
use crate::services::user_directory::UserDirectory;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub gateway: Option<Arc<GatewayCredentials>>,
}

impl AppState {
    /// Wires services around a connected pool and a user directory
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, errors::ServiceError> {
        let gateway = config
            .gateway_credentials
            .as_deref()
            .map(GatewayCredentials::parse)
            .transpose()
            .map_err(|e| errors::ServiceError::InternalError(e.to_string()))?
            .map(Arc::new);

        Ok(Self {
            services: handlers::AppServices::new(db.clone(), users),
            db,
            config,
            gateway,
        })
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn success_response_outside_request_has_no_request_id() {
        let response = ApiResponse::success(1);
        assert!(response.success);
        assert!(response.meta.unwrap().request_id.is_none());
    }
}

/// Order and item routes, guarded by gateway auth when it is configured
pub fn api_routes(gateway: Option<Arc<GatewayCredentials>>) -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/items/:id", get(handlers::items::get_item))
        .with_gateway_auth(gateway)
}

/// Builds the complete application router with its middleware stack
pub fn app_router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout();

    Router::new()
        .merge(api_routes(state.gateway.clone()))
        .merge(handlers::health::health_routes())
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

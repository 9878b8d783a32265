use axum::Json;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Orchestrator API",
        version = "1.0.0",
        description = r#"
Places orders against a shared inventory.

`POST /orders` verifies the user with the user directory, then reserves stock
for every line and stores the order in one database transaction. Either every
line is reserved and the order exists, or nothing changed.

## Authentication

When gateway credentials are configured, order and item routes require HTTP
Basic authentication. Health probes are always open.

## Errors

Every failure carries a stable `code`:

| code                 | status |
|----------------------|--------|
| invalid_input        | 400    |
| insufficient_stock   | 400    |
| unauthorized         | 401    |
| user_not_found       | 404    |
| item_not_found       | 404    |
| not_found            | 404    |
| persistence_failure  | 500    |
| upstream_unavailable | 503    |
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order placement and lookup"),
        (name = "items", description = "Item stock lookup"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::items::get_item,
        crate::handlers::health::liveness_check,
        crate::handlers::health::readiness_check,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::services::orders::CreateOrderCommand,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::PlacedOrder,
            crate::services::orders::OrderLineView,
            crate::services::orders::OrderDetail,
            crate::services::orders::OrderLineDetail,
            crate::services::inventory::ItemView,
            crate::handlers::health::ComponentStatus,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::LivenessResponse,
            crate::handlers::health::ReadinessResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BasicAuthAddon)
)]
pub struct ApiDoc;

struct BasicAuthAddon;

impl Modify for BasicAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Basic",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

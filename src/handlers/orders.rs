use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
};

use super::common::{created_response, json_body, path_id, success_response};
use crate::services::orders::{CreateOrderCommand, OrderDetail, PlacedOrder};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Create an order, reserving stock for every line or for none
#[utoipa::path(
    post,
    path = "/orders",
    summary = "Create order",
    description = "Verifies the user, reserves stock for every line in request order and stores the order. Nothing is changed when any step fails.",
    request_body = CreateOrderCommand,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<PlacedOrder>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid input or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse),
        (status = 404, description = "User or item not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::errors::ErrorResponse),
        (status = 503, description = "User directory unavailable", body = crate::errors::ErrorResponse),
    ),
    security((), ("Basic" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderCommand>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>), ServiceError> {
    let command = json_body(body)?;
    let order = state.services.orders.create_order(command).await?;
    Ok(created_response(order))
}

/// List all orders with their line details
#[utoipa::path(
    get,
    path = "/orders",
    summary = "List orders",
    description = "All orders in ascending id order, each line joined with the item's current name and price.",
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderDetail>>),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::errors::ErrorResponse),
    ),
    security((), ("Basic" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<OrderDetail>>>), ServiceError> {
    let orders = state.services.orders.list_orders().await?;
    Ok(success_response(orders))
}

/// Get a single order with its line details
#[utoipa::path(
    get,
    path = "/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Malformed order id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security((), ("Basic" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ServiceError> {
    let order_id = path_id(id)?;
    let order = state.services.orders.get_order(order_id).await?;
    Ok(success_response(order))
}

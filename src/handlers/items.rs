use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Json,
};

use super::common::{path_id, success_response};
use crate::services::inventory::ItemView;
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Get an item's current stock and price
#[utoipa::path(
    get,
    path = "/items/{id}",
    summary = "Get item",
    params(("id" = i32, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<ItemView>),
        (status = 400, description = "Malformed item id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security((), ("Basic" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ItemView>>), ServiceError> {
    let item_id = path_id(id)?;
    let item = state.services.inventory.get_item(item_id).await?;
    Ok(success_response(item))
}

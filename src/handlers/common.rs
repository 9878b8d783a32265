use crate::{errors::ServiceError, ApiResponse};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;

/// Unwraps a JSON body, reporting malformed input as `InvalidInput`
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))
}

/// Unwraps an integer path id, reporting a malformed id as `InvalidInput`
pub fn path_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, ServiceError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))
}

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

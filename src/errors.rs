use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "code": "insufficient_stock",
    "message": "Insufficient stock for item 2: requested 3, available 1",
    "item_id": 2,
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Stable machine-readable error code
    #[schema(example = "insufficient_stock")]
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Item that caused the failure, when one did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i32>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Item {0} not found")]
    ItemNotFound(i32),

    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::ItemNotFound(_) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PersistenceFailure(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable code clients can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UserNotFound(_) => "user_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// The item an error refers to, if any.
    pub fn item_id(&self) -> Option<i32> {
        match self {
            Self::ItemNotFound(id) => Some(*id),
            Self::InsufficientStock { item_id, .. } => Some(*item_id),
            _ => None,
        }
    }

    /// Whether a caller may safely resubmit the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_) | Self::PersistenceFailure(_)
        )
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::PersistenceFailure(_) => {
                "Persistence failure; no changes were applied".to_string()
            }
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::UpstreamUnavailable(service) => format!("{} is unavailable", service),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            item_id: self.item_id(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, "not_found");
    }

    #[rstest]
    #[case(ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::UserNotFound(1), StatusCode::NOT_FOUND)]
    #[case(ServiceError::ItemNotFound(1), StatusCode::NOT_FOUND)]
    #[case(
        ServiceError::InsufficientStock { item_id: 1, requested: 2, available: 1 },
        StatusCode::BAD_REQUEST
    )]
    #[case(
        ServiceError::UpstreamUnavailable("User directory".into()),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(
        ServiceError::PersistenceFailure(DbErr::Custom("boom".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case(ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED)]
    fn service_error_status_code_mapping(#[case] err: ServiceError, #[case] status: StatusCode) {
        assert_eq!(err.status_code(), status);
    }

    #[test]
    fn persistence_failure_hides_driver_message() {
        let err = ServiceError::PersistenceFailure(DbErr::Custom(
            "SQLITE_BUSY: database is locked".into(),
        ));
        let message = err.response_message();
        assert!(!message.contains("SQLITE"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn insufficient_stock_body_names_item() {
        let response = ServiceError::InsufficientStock {
            item_id: 7,
            requested: 3,
            available: 2,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "insufficient_stock");
        assert_eq!(payload.item_id, Some(7));
        assert!(payload.message.contains("item 7"));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!ServiceError::UserNotFound(3).is_retryable());
        assert!(!ServiceError::InsufficientStock {
            item_id: 1,
            requested: 5,
            available: 0
        }
        .is_retryable());
    }
}

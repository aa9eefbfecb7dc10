//! API errors and their JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bazaar_auth::AuthError;
use bazaar_commerce::CommerceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(%detail, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<CommerceError> for ApiError {
    fn from(e: CommerceError) -> Self {
        match e {
            CommerceError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            CommerceError::Duplicate(_) => ApiError::Conflict(e.to_string()),
            CommerceError::Forbidden(message) => ApiError::Forbidden(message),
            CommerceError::Validation(_)
            | CommerceError::InsufficientStock { .. }
            | CommerceError::InvalidCoupon(_)
            | CommerceError::InvalidTransition { .. }
            | CommerceError::Overflow => ApiError::BadRequest(e.to_string()),
            CommerceError::Database(_) | CommerceError::Serialization(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::NotAuthenticated => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::InsufficientPermissions(_) => ApiError::Forbidden(e.to_string()),
            AuthError::UserNotFound(_) => ApiError::NotFound(e.to_string()),
            AuthError::UserAlreadyExists
            | AuthError::InvalidToken
            | AuthError::WeakPassword(_)
            | AuthError::Validation(_)
            | AuthError::IncorrectPassword => ApiError::BadRequest(e.to_string()),
            AuthError::Commerce(inner) => inner.into(),
            AuthError::Hashing(_) | AuthError::Cache(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::BadRequest(rejection.body_text()),
        }
    }
}

/// `Json` whose rejections use the API error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: ApiError = CommerceError::not_found("Product", "abc").into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Product not found with id of abc");

        let duplicate: ApiError = CommerceError::Duplicate("name".into()).into();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let login: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(login.status(), StatusCode::UNAUTHORIZED);

        let role: ApiError = AuthError::InsufficientPermissions("user".into()).into();
        assert_eq!(role.status(), StatusCode::FORBIDDEN);

        let nested: ApiError = AuthError::Commerce(CommerceError::invalid("bad")).into();
        assert_eq!(nested.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_body_shape() {
        let response = ApiError::bad_request("Please enter your name").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"success": false, "message": "Please enter your name"}));
    }
}

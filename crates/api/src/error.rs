//! JSON error responses.
//!
//! Every failure leaves the API as `{"error": <code>, "message": <text>}`.
//! Infrastructure failures are logged with their detail and answered with a
//! generic message.

use std::borrow::Cow;
use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use grocer_core::auth::PasswordError;
use grocer_core::catalog::CatalogError;
use grocer_core::order::OrderError;
use grocer_db::repositories::CartError;
use grocer_shared::{AppError, JwtError};
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status and code.
    pub fn new(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// 400 with a domain code.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 401 with a domain code.
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    /// 403 with a domain code.
    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    /// 404 with a domain code.
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// 409 with a domain code.
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Logs `err` and returns a generic 500.
    pub fn internal(err: impl fmt::Display) -> Self {
        error!(error = %err, "Request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred",
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        if e.is_internal() {
            return Self::internal(e);
        }
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(
            status,
            e.error_code().to_ascii_lowercase(),
            e.public_message(),
        )
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        let status = match &e {
            OrderError::FranchiseNotFound(_) | OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Forbidden => StatusCode::FORBIDDEN,
            OrderError::NoFranchiseServesLocation
            | OrderError::EmptyCart
            | OrderError::InsufficientStock { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::OrderNumberExhausted | OrderError::Database(_) => {
                return Self::internal(e);
            }
        };
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<CartError> for ApiError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity => {
                Self::bad_request("invalid_quantity", "Quantity must be at least 1")
            }
            CartError::ProductNotFound(id) => {
                Self::not_found("product_not_found", format!("Product not found: {id}"))
            }
            CartError::Database(db) => Self::internal(db),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound(id) => {
                Self::not_found("product_not_found", format!("Product not found: {id}"))
            }
            CatalogError::CategoryNotFound(id) => {
                Self::not_found("category_not_found", format!("Category not found: {id}"))
            }
            CatalogError::Storage(_) | CatalogError::Database(_) => Self::internal(e),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(e: DbErr) -> Self {
        Self::internal(e)
    }
}

impl From<JwtError> for ApiError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => Self::unauthorized("token_expired", "Token has expired"),
            JwtError::DecodingError(_) | JwtError::Invalid => {
                Self::unauthorized("invalid_token", "Invalid or malformed token")
            }
            JwtError::EncodingError(_) => Self::internal(e),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort => Self::bad_request("weak_password", e.to_string()),
            PasswordError::HashError(_)
            | PasswordError::VerifyError(_)
            | PasswordError::InvalidHash => Self::internal(e),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        let mut fields: Vec<String> = e.field_errors().keys().map(ToString::to_string).collect();
        fields.sort_unstable();
        Self::bad_request(
            "validation_error",
            format!("Invalid fields: {}", fields.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_core::order::OrderStatus;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case(OrderError::EmptyCart, StatusCode::BAD_REQUEST, "empty_cart")]
    #[case(
        OrderError::InsufficientStock { item_name: "Milk".into() },
        StatusCode::BAD_REQUEST,
        "insufficient_stock"
    )]
    #[case(
        OrderError::NoFranchiseServesLocation,
        StatusCode::BAD_REQUEST,
        "no_franchise_serves_location"
    )]
    #[case(
        OrderError::FranchiseNotFound(Uuid::nil()),
        StatusCode::NOT_FOUND,
        "franchise_not_found"
    )]
    #[case(
        OrderError::InvalidTransition { from: OrderStatus::Delivered, to: OrderStatus::Pending },
        StatusCode::BAD_REQUEST,
        "invalid_transition"
    )]
    #[case(OrderError::Forbidden, StatusCode::FORBIDDEN, "forbidden")]
    #[case(
        OrderError::Database("connection reset".into()),
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error"
    )]
    fn test_order_error_mapping(
        #[case] err: OrderError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let api: ApiError = err.into();
        assert_eq!(api.status(), status);
        assert_eq!(api.code(), code);
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let api: ApiError = OrderError::Database("password=hunter2".into()).into();
        assert_eq!(api.message(), "An internal error occurred");
    }

    #[test]
    fn test_app_error_codes_are_lowercase() {
        let api: ApiError = AppError::Conflict("Email already registered".into()).into();
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.code(), "conflict");
        assert_eq!(api.message(), "Email already registered");
    }

    #[test]
    fn test_jwt_expiry_is_distinguished() {
        let expired: ApiError = JwtError::Expired.into();
        let garbage: ApiError = JwtError::DecodingError("bad base64".into()).into();
        assert_eq!(expired.code(), "token_expired");
        assert_eq!(garbage.code(), "invalid_token");
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = ApiError::not_found("order_not_found", "Order not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "order_not_found");
        assert_eq!(value["message"], "Order not found");
    }
}

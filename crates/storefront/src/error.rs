//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies are JSON: `{"error": "<kind>", "message": "<text>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use sundry_core::order::TransitionError;
use sundry_core::pricing::{CheckoutError, VoucherRejection};

use crate::db::RepositoryError;

/// Message shown when a confirmed preview no longer matches live prices.
pub const PREVIEW_STALE_MESSAGE: &str = "Order details changed, please review and retry";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Pricing or order placement was refused.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Order status change was refused.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Voucher cannot be saved or used.
    #[error(transparent)]
    Voucher(#[from] VoucherRejection),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity is missing or invalid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_)
                | CheckoutError::InvalidLine(_)
                | CheckoutError::InvalidPoints(_) => StatusCode::BAD_REQUEST,
                CheckoutError::MethodUnavailable(_)
                | CheckoutError::VoucherNoLongerValid(_)
                | CheckoutError::InsufficientPoints { .. }
                | CheckoutError::PreviewStale { .. } => StatusCode::CONFLICT,
            },
            Self::Transition(TransitionError::NotAllowed { .. }) => StatusCode::CONFLICT,
            Self::Transition(TransitionError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Self::Voucher(VoucherRejection::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Voucher(VoucherRejection::Unauthorized { .. }) => StatusCode::FORBIDDEN,
            Self::Voucher(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => "not_found",
            Self::Database(RepositoryError::Conflict(_)) => "conflict",
            Self::Database(_) | Self::Internal(_) => "internal",
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_)
                | CheckoutError::InvalidLine(_)
                | CheckoutError::InvalidPoints(_) => "validation_error",
                CheckoutError::MethodUnavailable(_) => "method_unavailable",
                CheckoutError::VoucherNoLongerValid(_) => "voucher_no_longer_valid",
                CheckoutError::InsufficientPoints { .. } => "insufficient_points",
                CheckoutError::PreviewStale { .. } => "preview_stale",
            },
            Self::Transition(TransitionError::NotAllowed { .. }) => "invalid_transition",
            Self::Transition(TransitionError::Forbidden { .. }) => "forbidden",
            Self::Voucher(rejection) => rejection.kind(),
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "validation_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Internal(_))
            || matches!(
                self,
                Self::Database(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
            )
        {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Checkout(CheckoutError::PreviewStale { .. }) => PREVIEW_STALE_MESSAGE.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Transition(err) => err.to_string(),
            Self::Voucher(rejection) => rejection.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sundry_core::pricing::{LineError, ShippingError};
    use sundry_core::{Money, OrderStatus, ProductId, VoucherCode};
    use sundry_core::order::OrderAction;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Order 123".to_string());
        assert_eq!(err.to_string(), "Not found: Order 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(
            get_status(CheckoutError::Validation("empty".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                CheckoutError::from(LineError::ZeroQuantity {
                    product_id: ProductId::new(1)
                })
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::from(ShippingError::NoneAvailable).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(
                CheckoutError::InsufficientPoints {
                    requested: 10,
                    available: 5
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(
                CheckoutError::VoucherNoLongerValid(VoucherRejection::UsageExceeded {
                    code: VoucherCode::parse("SALE").unwrap()
                })
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_other_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(
                TransitionError::NotAllowed {
                    action: OrderAction::Ship,
                    status: OrderStatus::Cancelled
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_preview_stale_hides_totals() {
        let body = get_body(
            CheckoutError::PreviewStale {
                submitted: Money::new(300_000),
                computed: Money::new(350_000),
            }
            .into(),
        )
        .await;

        assert_eq!(body["error"], "preview_stale");
        assert_eq!(body["message"], PREVIEW_STALE_MESSAGE);
    }

    #[tokio::test]
    async fn test_internal_details_are_not_exposed() {
        let body = get_body(AppError::Internal("connection reset by peer".to_string())).await;
        assert_eq!(body["error"], "internal");
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_voucher_rejection_body() {
        let body = get_body(
            VoucherRejection::Expired {
                code: VoucherCode::parse("SUMMER").unwrap(),
            }
            .into(),
        )
        .await;
        assert_eq!(body["error"], "expired");
        assert_eq!(body["message"], "Voucher SUMMER is not valid at this time");
    }

    #[test]
    fn test_voucher_rejection_status_codes() {
        let code = || VoucherCode::parse("VIP50").unwrap();
        assert_eq!(
            get_status(VoucherRejection::NotFound { code: code() }.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(VoucherRejection::Unauthorized { code: code() }.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(VoucherRejection::Inactive { code: code() }.into()),
            StatusCode::CONFLICT
        );
    }
}

//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                          - Liveness check
//! GET   /health/ready                    - Readiness check (database)
//! GET   /api/shipping-methods            - Active shipping methods
//!
//! # Checkout (customer)
//! POST  /api/orders/preview              - Price preview
//! POST  /api/orders                      - Place order from a confirmed preview
//!
//! # Orders (customer)
//! GET   /api/orders                      - Own orders, newest first
//! GET   /api/orders/{id}                 - Order document with timeline
//! PATCH /api/orders/{id}/cancel          - Cancel, or request cancellation once shipped
//! PATCH /api/orders/{id}/confirm-receipt - Delivered to completed
//! PATCH /api/orders/{id}/return          - Request a return after a failed delivery
//!
//! # Shop (staff)
//! PATCH /api/shop/orders/{id}/status     - Apply a shop action `{action, note?}`
//! POST  /api/shop/vouchers/{code}/grant  - Issue a voucher to `{customerId}`
//!
//! # Vouchers (customer)
//! POST  /api/vouchers/{code}/save        - Save to wallet
//! GET   /api/vouchers/saved              - Wallet with usage
//! ```

pub mod checkout;
pub mod health;
pub mod orders;
pub mod shipping;
pub mod shop;
pub mod vouchers;

use axum::{
    Router,
    extract::FromRequest,
    extract::FromRequestParts,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{make_request_span, request_id_middleware};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error format.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(checkout::create))
        .route("/preview", post(checkout::preview))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", patch(orders::cancel))
        .route("/{id}/confirm-receipt", patch(orders::confirm_receipt))
        .route("/{id}/return", patch(orders::request_return))
}

/// Create the voucher wallet routes router.
pub fn voucher_routes() -> Router<AppState> {
    Router::new()
        .route("/saved", get(vouchers::saved))
        .route("/{code}/save", post(vouchers::save))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shipping-methods", get(shipping::index))
        .nest("/api/orders", order_routes())
        .route("/api/shop/orders/{id}/status", patch(shop::update_status))
        .route("/api/shop/vouchers/{code}/grant", post(shop::grant_voucher))
        .nest("/api/vouchers", voucher_routes())
}

/// Build the complete application with middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{LifecycleConfig, StorefrontConfig};
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::middleware::auth::CUSTOMER_ID_HEADER;

    /// An app whose pool never connects; only handlers that fail before
    /// touching the database can be exercised.
    fn test_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost:1/unused".to_string()),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            lifecycle: LifecycleConfig::default(),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_customer_routes_require_identity() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_shop_routes_require_staff() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/shop/orders/1/status")
                    .header(CUSTOMER_ID_HEADER, "1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"action":"confirm"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_preview_without_voucher_key_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orders/preview")
                    .header(CUSTOMER_ID_HEADER, "1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"orderLines":[{"productId":1,"quantity":1}],"shippingMethod":null,"pointsToApply":0}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(json_body(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_invalid_order_id_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/orders/not-a-number")
                    .header(CUSTOMER_ID_HEADER, "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_customers_cannot_grant_vouchers() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/shop/vouchers/VIP50/grant")
                    .header(CUSTOMER_ID_HEADER, "42")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"customerId":42}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "unauthorized");
    }
}

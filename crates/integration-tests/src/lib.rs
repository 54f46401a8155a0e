//! Integration tests for Sundry checkout.
//!
//! # Running Tests
//!
//! The database-backed tests are ignored by default. Each one gets a fresh
//! database from `#[sqlx::test]`, migrated from `crates/storefront/migrations`.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/sundry_test cargo test -p sundry-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Preview and order placement through the HTTP API
//! - `order_lifecycle` - Transitions, point restores and loyalty credits
//! - `voucher_consolidation` - Legacy redemption records

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use sundry_core::{CustomerId, DiscountType, OrderId, ProductId, VoucherId, VoucherVisibility};
use sundry_storefront::config::{LifecycleConfig, StorefrontConfig};
use sundry_storefront::middleware::auth::{CUSTOMER_ID_HEADER, CUSTOMER_NAME_HEADER, STAFF_NAME_HEADER};
use sundry_storefront::state::AppState;

/// Configuration pointing nowhere; tests hand the pool in directly.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/unused".to_string()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        lifecycle: LifecycleConfig {
            sweep_interval: None,
            ..LifecycleConfig::default()
        },
    }
}

/// The storefront router over `pool`.
#[must_use]
pub fn app(pool: PgPool) -> Router {
    sundry_storefront::routes::app(AppState::new(test_config(), pool))
}

/// Who a test request is sent as.
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Customer(i32),
    Staff,
    Anonymous,
}

/// Send one request and decode the JSON response body.
///
/// # Panics
///
/// Panics if the request cannot be built or the body is not JSON.
pub async fn send(app: &Router, caller: Caller, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = match caller {
        Caller::Customer(id) => builder
            .header(CUSTOMER_ID_HEADER, id.to_string())
            .header(CUSTOMER_NAME_HEADER, format!("Test customer {id}")),
        Caller::Staff => builder.header(STAFF_NAME_HEADER, "Test staff"),
        Caller::Anonymous => builder,
    };
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, json)
}

/// A valid shipping address body.
#[must_use]
pub fn shipping_address() -> Value {
    serde_json::json!({
        "recipientName": "Test Recipient",
        "phoneNumber": "0901234567",
        "province": "Ho Chi Minh City",
        "district": "District 1",
        "ward": "Ben Nghe",
        "street": "1 Le Loi"
    })
}

/// Preview, then place the order from the returned preview.
///
/// # Panics
///
/// Panics if either request fails.
pub async fn place_order(app: &Router, customer: i32, preview: Value, payment_method: &str) -> Value {
    let (status, previewed) = send(app, Caller::Customer(customer), Method::POST, "/api/orders/preview", Some(preview)).await;
    assert_eq!(status, StatusCode::OK, "preview failed: {previewed}");

    let body = serde_json::json!({
        "previewOrder": previewed["previewOrder"],
        "shippingAddress": shipping_address(),
        "paymentMethod": payment_method,
    });
    let (status, created) = send(app, Caller::Customer(customer), Method::POST, "/api/orders", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    created
}

/// The order id from a create response.
///
/// # Panics
///
/// Panics if the response has no numeric `orderId`.
#[must_use]
pub fn order_id(created: &Value) -> OrderId {
    let id = created["orderId"].as_i64().expect("orderId");
    OrderId::new(i32::try_from(id).expect("orderId fits i32"))
}

// ============================================================================
// Seed data
// ============================================================================

/// Insert a product.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_product(pool: &PgPool, name: &str, price: i64, discount_percent: Decimal) -> ProductId {
    sqlx::query_scalar("INSERT INTO product (name, price, discount_percent) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(price)
        .bind(discount_percent)
        .fetch_one(pool)
        .await
        .expect("seed product")
}

/// Insert a customer with a loyalty balance.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_customer(pool: &PgPool, id: i32, loyalty_points: i64) -> CustomerId {
    sqlx::query_scalar("INSERT INTO customer (id, name, loyalty_points) VALUES ($1, $2, $3) RETURNING id")
        .bind(id)
        .bind(format!("Test customer {id}"))
        .bind(loyalty_points)
        .fetch_one(pool)
        .await
        .expect("seed customer")
}

/// A voucher to insert; defaults to a public 20% voucher capped at 80,000.
#[derive(Debug, Clone)]
pub struct VoucherSeed {
    pub code: &'static str,
    pub visibility: VoucherVisibility,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase_amount: i64,
    pub max_discount_amount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl Default for VoucherSeed {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            code: "SPRING20",
            visibility: VoucherVisibility::Public,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            min_purchase_amount: 200_000,
            max_discount_amount: Some(80_000),
            usage_limit: None,
            per_user_limit: 1,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            is_active: true,
        }
    }
}

/// Insert a voucher.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_voucher(pool: &PgPool, seed: &VoucherSeed) -> VoucherId {
    sqlx::query_scalar(
        r"
        INSERT INTO voucher (
            code, visibility, discount_type, discount_value, min_purchase_amount,
            max_discount_amount, usage_limit, per_user_limit, start_date, end_date, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        ",
    )
    .bind(seed.code)
    .bind(seed.visibility)
    .bind(seed.discount_type)
    .bind(seed.discount_value)
    .bind(seed.min_purchase_amount)
    .bind(seed.max_discount_amount)
    .bind(seed.usage_limit)
    .bind(seed.per_user_limit)
    .bind(seed.start_date)
    .bind(seed.end_date)
    .bind(seed.is_active)
    .fetch_one(pool)
    .await
    .expect("seed voucher")
}

// ============================================================================
// Assertions on stored state
// ============================================================================

/// Current loyalty balance.
///
/// # Panics
///
/// Panics if the customer does not exist.
pub async fn loyalty_points(pool: &PgPool, customer: i32) -> i64 {
    sqlx::query_scalar("SELECT loyalty_points FROM customer WHERE id = $1")
        .bind(customer)
        .fetch_one(pool)
        .await
        .expect("customer balance")
}

/// Global usage count of a voucher.
///
/// # Panics
///
/// Panics if the voucher does not exist.
pub async fn voucher_used_count(pool: &PgPool, voucher: VoucherId) -> i32 {
    sqlx::query_scalar("SELECT used_count FROM voucher WHERE id = $1")
        .bind(voucher)
        .fetch_one(pool)
        .await
        .expect("voucher used_count")
}

/// A customer's usage count of a voucher, if they have a record.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn user_voucher_usage(pool: &PgPool, customer: i32, voucher: VoucherId) -> Option<i32> {
    sqlx::query_scalar("SELECT usage_count FROM user_voucher WHERE customer_id = $1 AND voucher_id = $2")
        .bind(customer)
        .bind(voucher)
        .fetch_optional(pool)
        .await
        .expect("user voucher")
}

/// Number of orders in the database.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn order_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM customer_order")
        .fetch_one(pool)
        .await
        .expect("order count")
}

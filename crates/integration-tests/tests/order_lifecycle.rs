//! Integration tests for order status transitions.
//!
//! These tests require a `PostgreSQL` server reachable through `DATABASE_URL`.
//!
//! Run with: cargo test -p sundry-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use sundry_core::OrderId;
use sundry_integration_tests::{
    Caller, app, loyalty_points, order_id, place_order, seed_customer, seed_product, send,
    test_config,
};
use sundry_storefront::services::sweeper;

/// Place a 500,000 order paying 100,000 in points from a 200,000 balance.
async fn order_with_points(pool: &PgPool, app: &Router, payment_method: &str) -> OrderId {
    let product = seed_product(pool, "Linen shirt", 250_000, Decimal::ZERO).await;
    seed_customer(pool, 1, 200_000).await;
    let preview = json!({
        "orderLines": [{ "productId": product.as_i32(), "quantity": 2 }],
        "shippingMethod": "standard",
        "voucherCode": null,
        "pointsToApply": 100_000,
    });
    let created = place_order(app, 1, preview, payment_method).await;
    assert_eq!(loyalty_points(pool, 1).await, 100_000);
    order_id(&created)
}

async fn shop(app: &Router, id: OrderId, action: &str) -> (StatusCode, Value) {
    send(
        app,
        Caller::Staff,
        Method::PATCH,
        &format!("/api/shop/orders/{id}/status"),
        Some(json!({ "action": action })),
    )
    .await
}

async fn customer(app: &Router, id: OrderId, action: &str) -> (StatusCode, Value) {
    send(app, Caller::Customer(1), Method::PATCH, &format!("/api/orders/{id}/{action}"), None).await
}

async fn ship(app: &Router, id: OrderId) {
    for action in ["confirm", "start_preparing", "ship"] {
        let (status, body) = shop(app, id, action).await;
        assert_eq!(status, StatusCode::OK, "{action} failed: {body}");
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_new_order_restores_points(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "cod").await;

    let (status, order) = customer(&app, id, "cancel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(order["canCancel"], false);
    assert_eq!(order["timeline"].as_array().map(Vec::len), Some(2));
    assert_eq!(loyalty_points(&pool, 1).await, 200_000);

    // Cancelling twice is refused and restores nothing more
    let (status, error) = customer(&app, id, "cancel").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "invalid_transition");
    assert_eq!(loyalty_points(&pool, 1).await, 200_000);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_after_shipping_needs_shop_approval(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "cod").await;
    ship(&app, id).await;

    let (status, order) = customer(&app, id, "cancel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancellation_requested");
    assert_eq!(order["resumeStatus"], "shipping_in_progress");

    let (_, order) = shop(&app, id, "reject_cancellation").await;
    assert_eq!(order["status"], "shipping_in_progress");
    assert_eq!(loyalty_points(&pool, 1).await, 100_000);

    customer(&app, id, "cancel").await;
    let (status, order) = shop(&app, id, "approve_cancellation").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(loyalty_points(&pool, 1).await, 200_000);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_confirm_receipt_credits_loyalty(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "cod").await;
    ship(&app, id).await;

    let (_, order) = shop(&app, id, "mark_delivered").await;
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["payment"]["status"], "paid");

    let (status, order) = customer(&app, id, "confirm-receipt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "completed");
    // 1% of 430,000 (500,000 + 30,000 shipping - 100,000 points)
    assert_eq!(order["loyaltyEarned"], 4_300);
    assert_eq!(loyalty_points(&pool, 1).await, 104_300);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_delivery_return_and_refund(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "bank_transfer").await;
    let (_, order) = shop(&app, id, "record_payment").await;
    assert_eq!(order["payment"]["status"], "paid");
    ship(&app, id).await;

    shop(&app, id, "mark_delivery_failed").await;
    let (status, order) = customer(&app, id, "return").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "return_requested");

    let (_, order) = shop(&app, id, "refund").await;
    assert_eq!(order["status"], "refunded");
    assert_eq!(order["payment"]["status"], "refunded");
    assert_eq!(loyalty_points(&pool, 1).await, 200_000);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_role_checks(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "cod").await;

    // Shop actions need a staff identity
    let (status, _) = send(
        &app,
        Caller::Customer(1),
        Method::PATCH,
        &format!("/api/shop/orders/{id}/status"),
        Some(json!({ "action": "confirm" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Staff cannot confirm receipt on the customer's behalf
    let (status, error) = shop(&app, id, "confirm_receipt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["error"], "forbidden");

    // Steps cannot be skipped
    let (status, _) = shop(&app, id, "ship").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_sweeper_marks_overdue_and_auto_completes(pool: PgPool) {
    let app = app(pool.clone());
    let unpaid = order_with_points(&pool, &app, "bank_transfer").await;

    let product = seed_product(&pool, "Wool scarf", 120_000, Decimal::ZERO).await;
    let delivered = order_id(
        &place_order(
            &app,
            1,
            json!({
                "orderLines": [{ "productId": product.as_i32(), "quantity": 1 }],
                "shippingMethod": "standard",
                "voucherCode": null,
                "pointsToApply": 0,
            }),
            "cod",
        )
        .await,
    );
    ship(&app, delivered).await;
    shop(&app, delivered, "mark_delivered").await;

    let lifecycle = test_config().lifecycle;

    // Nothing is old enough yet
    let report = sweeper::run_once(&pool, &lifecycle, Utc::now()).await.unwrap();
    assert_eq!(report.marked_overdue + report.auto_completed, 0);

    let later = Utc::now() + Duration::days(8);
    let report = sweeper::run_once(&pool, &lifecycle, later).await.unwrap();
    assert_eq!(report.marked_overdue, 1);
    assert_eq!(report.auto_completed, 1);
    assert_eq!(report.skipped, 0);

    let (_, order) = send(&app, Caller::Customer(1), Method::GET, &format!("/api/orders/{unpaid}"), None).await;
    assert_eq!(order["status"], "payment_overdue");
    assert_eq!(order["timeline"].as_array().unwrap().last().unwrap()["performedBy"]["userType"], "system");

    let (_, order) = send(&app, Caller::Customer(1), Method::GET, &format!("/api/orders/{delivered}"), None).await;
    assert_eq!(order["status"], "completed");
    // 1% of 150,000
    assert_eq!(order["loyaltyEarned"], 1_500);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_declined_cancellation_keeps_delivery_clock(pool: PgPool) {
    let app = app(pool.clone());
    let id = order_with_points(&pool, &app, "cod").await;
    ship(&app, id).await;
    shop(&app, id, "mark_delivered").await;

    // Delivered eight days ago
    sqlx::query("UPDATE order_event SET created_at = created_at - INTERVAL '8 days' WHERE order_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE customer_order SET status_changed_at = status_changed_at - INTERVAL '8 days' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let (_, order) = customer(&app, id, "cancel").await;
    assert_eq!(order["status"], "cancellation_requested");
    let (_, order) = shop(&app, id, "reject_cancellation").await;
    assert_eq!(order["status"], "delivered");

    let lifecycle = test_config().lifecycle;
    let report = sweeper::run_once(&pool, &lifecycle, Utc::now()).await.unwrap();
    assert_eq!(report.auto_completed, 1);

    let (_, order) = send(&app, Caller::Customer(1), Method::GET, &format!("/api/orders/{id}"), None).await;
    assert_eq!(order["status"], "completed");
}

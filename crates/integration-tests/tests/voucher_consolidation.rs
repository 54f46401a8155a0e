//! Integration tests for folding legacy redemption rows into `user_voucher`.
//!
//! These tests require a `PostgreSQL` server reachable through `DATABASE_URL`.
//!
//! Run with: cargo test -p sundry-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use sundry_core::redemption;
use sundry_core::{CustomerId, VoucherId};
use sundry_integration_tests::{VoucherSeed, seed_voucher, user_voucher_usage};
use sundry_storefront::db::VoucherRepository;

async fn legacy_row(
    pool: &PgPool,
    customer: i32,
    voucher: VoucherId,
    usage_count: Option<i32>,
    is_used: Option<bool>,
    user_usage_limit: Option<i32>,
    saved_at: DateTime<Utc>,
) {
    sqlx::query(
        r"
        INSERT INTO legacy_user_voucher (customer_id, voucher_id, usage_count, is_used, user_usage_limit, saved_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(customer)
    .bind(voucher)
    .bind(usage_count)
    .bind(is_used)
    .bind(user_usage_limit)
    .bind(saved_at)
    .execute(pool)
    .await
    .unwrap();
}

async fn consolidate(pool: &PgPool) -> u64 {
    let mut tx = pool.begin().await.unwrap();
    let legacy = VoucherRepository::new(&mut tx).legacy_rows().await.unwrap();
    let records = redemption::consolidate(legacy);
    let merged = VoucherRepository::new(&mut tx)
        .merge_redemptions(&records)
        .await
        .unwrap();
    VoucherRepository::new(&mut tx).clear_legacy().await.unwrap();
    tx.commit().await.unwrap();
    merged
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicates_merge_into_one_record(pool: PgPool) {
    let voucher = seed_voucher(&pool, &VoucherSeed::default()).await;
    let earliest = Utc::now() - Duration::days(10);

    legacy_row(&pool, 1, voucher, None, Some(true), Some(2), earliest).await;
    legacy_row(&pool, 1, voucher, Some(1), None, None, earliest + Duration::days(1)).await;
    legacy_row(&pool, 2, voucher, None, Some(false), None, earliest).await;

    assert_eq!(consolidate(&pool).await, 2);

    assert_eq!(user_voucher_usage(&pool, 1, voucher).await, Some(3));
    assert_eq!(user_voucher_usage(&pool, 2, voucher).await, Some(0));

    let mut conn = pool.acquire().await.unwrap();
    let saved = VoucherRepository::new(&mut conn)
        .saved_entry(CustomerId::new(1), voucher)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.1.timestamp(), earliest.timestamp());

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM legacy_user_voucher")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_merges_into_existing_records(pool: PgPool) {
    let voucher = seed_voucher(&pool, &VoucherSeed::default()).await;
    let earliest = Utc::now() - Duration::days(30);

    sqlx::query("INSERT INTO user_voucher (customer_id, voucher_id, usage_count) VALUES (1, $1, 1)")
        .bind(voucher)
        .execute(&pool)
        .await
        .unwrap();
    legacy_row(&pool, 1, voucher, None, Some(true), None, earliest).await;

    consolidate(&pool).await;
    assert_eq!(user_voucher_usage(&pool, 1, voucher).await, Some(2));

    // Running again with nothing staged changes nothing
    assert_eq!(consolidate(&pool).await, 0);
    assert_eq!(user_voucher_usage(&pool, 1, voucher).await, Some(2));
}

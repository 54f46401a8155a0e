//! Order preview and placement.
//!
//! Both operations load the same live state (product prices, shipping
//! catalog, voucher, loyalty balance) and hand it to the pricing engine.
//! Placement does so inside one transaction with the customer row locked,
//! then claims voucher usage and debits points with conditional updates.
//! Any failure drops the transaction and rolls every counter back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use sundry_core::order::TimelineEntry;
use sundry_core::pricing::{
    self, CheckoutError, CheckoutInput, OrderLine, VoucherLookup, VoucherRejection,
};
use sundry_core::{ProductId, VoucherCode};

use crate::db::orders::NewOrder;
use crate::db::{CatalogRepository, CustomerRepository, OrderRepository, VoucherRepository};
use crate::error::{AppError, Result};
use crate::middleware::CurrentCustomer;
use crate::models::{CreateOrderRequest, CreatedOrder, LineRequest, PreviewRequest, PreviewResponse};

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price a selection for display.
    ///
    /// Voucher, shipping and point problems become notices; only malformed
    /// input fails.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown products, `AppError::Checkout`
    /// for malformed input, and `AppError::Database` if loading fails.
    #[instrument(skip(self, customer, request), fields(customer_id = %customer.id))]
    pub async fn preview(
        &self,
        customer: &CurrentCustomer,
        request: PreviewRequest,
        now: DateTime<Utc>,
    ) -> Result<PreviewResponse> {
        let mut conn = self.pool.acquire().await?;

        let lines = load_lines(&mut conn, &request.order_lines).await?;
        let catalog = CatalogRepository::new(&mut conn).shipping_catalog().await?;
        let loyalty_balance = CustomerRepository::new(&mut conn)
            .loyalty_balance(customer.id)
            .await?;
        let voucher = lookup_voucher(&mut conn, request.voucher_code.as_ref(), customer).await?;

        let input = CheckoutInput {
            lines,
            catalog: &catalog,
            shipping_method: request.shipping_method.as_deref(),
            voucher,
            points_requested: request.points_to_apply,
            loyalty_balance,
            now,
        };
        let preview = pricing::preview(&input)?;

        tracing::debug!(
            subtotal = %preview.quote.subtotal,
            total = %preview.quote.total_amount,
            notices = preview.notices.len(),
            "Order previewed"
        );
        Ok(preview.into())
    }

    /// Re-price a confirmed preview against live state and persist the order.
    ///
    /// # Errors
    ///
    /// - `AppError::BadRequest` if the shipping address is invalid
    /// - `AppError::NotFound` for unknown products
    /// - `AppError::Checkout` with `VoucherNoLongerValid`, `InsufficientPoints`,
    ///   `MethodUnavailable` or `PreviewStale` when live state disagrees
    /// - `AppError::Database` if any query fails
    #[instrument(skip(self, customer, request), fields(customer_id = %customer.id))]
    pub async fn place_order(
        &self,
        customer: &CurrentCustomer,
        request: CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<CreatedOrder> {
        let shipping_address = request
            .shipping_address
            .validate()
            .map_err(AppError::BadRequest)?;
        let submitted = request.preview_order;

        let mut tx = self.pool.begin().await?;

        CustomerRepository::new(&mut tx)
            .ensure(customer.id, &customer.name)
            .await?;
        let loyalty_balance = CustomerRepository::new(&mut tx)
            .lock_balance(customer.id)
            .await?;
        let catalog = CatalogRepository::new(&mut tx).shipping_catalog().await?;
        let lines = load_lines(&mut tx, &submitted.order_lines).await?;
        let voucher = lookup_voucher(&mut tx, submitted.voucher_code.as_ref(), customer).await?;
        let per_user_limit = match &voucher {
            Some(VoucherLookup::Found { voucher, .. }) => voucher.per_user_limit,
            _ => 1,
        };

        let input = CheckoutInput {
            lines,
            catalog: &catalog,
            shipping_method: submitted.shipping_method.as_deref(),
            voucher,
            points_requested: submitted.points_applied,
            loyalty_balance,
            now,
        };
        let quote = pricing::finalize(&input, submitted.total_amount).inspect_err(|err| {
            if let CheckoutError::PreviewStale {
                submitted: submitted_total,
                computed,
            } = err
            {
                warn!(
                    customer_id = %customer.id,
                    submitted = %submitted_total,
                    computed = %computed,
                    submitted_subtotal = %submitted.subtotal,
                    submitted_shipping_fee = %submitted.shipping_fee,
                    submitted_discount = %submitted.discount,
                    "Submitted preview is stale"
                );
            }
        })?;

        if let (Some(voucher_id), Some(code)) = (quote.voucher_id, quote.voucher_code.as_ref()) {
            let exhausted = || {
                CheckoutError::VoucherNoLongerValid(VoucherRejection::UsageExceeded {
                    code: code.clone(),
                })
            };
            if !VoucherRepository::new(&mut tx)
                .increment_usage(voucher_id)
                .await?
            {
                return Err(exhausted().into());
            }
            if !VoucherRepository::new(&mut tx)
                .record_redemption(customer.id, voucher_id, per_user_limit)
                .await?
            {
                return Err(exhausted().into());
            }
        }

        if quote.points_applied > 0
            && !CustomerRepository::new(&mut tx)
                .debit_points(customer.id, quote.points_applied)
                .await?
        {
            return Err(CheckoutError::InsufficientPoints {
                requested: quote.points_applied,
                available: loyalty_balance,
            }
            .into());
        }

        let placed = TimelineEntry::placed(customer.actor(), now);
        let order_id = OrderRepository::new(&mut tx)
            .insert(&NewOrder {
                customer_id: customer.id,
                quote: &quote,
                shipping_address: &shipping_address,
                payment_method: request.payment_method,
                placed: &placed,
            })
            .await?;
        let order = OrderRepository::new(&mut tx)
            .find(order_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("order {order_id} vanished after insert")))?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            total = %quote.total_amount,
            voucher = quote.voucher_code.as_ref().map(VoucherCode::as_str),
            points_applied = quote.points_applied,
            "Order placed"
        );
        Ok(CreatedOrder { order_id, order })
    }
}

/// Resolve requested lines against current product prices.
async fn load_lines(conn: &mut PgConnection, requested: &[LineRequest]) -> Result<Vec<OrderLine>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<ProductId> = requested.iter().map(|line| line.product_id).collect();
    let products: HashMap<_, _> = CatalogRepository::new(conn)
        .products(&ids)
        .await?
        .into_iter()
        .filter(|product| product.is_active)
        .map(|product| (product.id, product))
        .collect();

    requested
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;
            Ok(OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                image_url: product.image_url.clone(),
                unit_price: product.price,
                discount_percent: product.discount_percent,
                quantity: line.quantity,
            })
        })
        .collect()
}

async fn lookup_voucher(
    conn: &mut PgConnection,
    code: Option<&VoucherCode>,
    customer: &CurrentCustomer,
) -> Result<Option<VoucherLookup>> {
    match code {
        Some(code) => Ok(Some(
            VoucherRepository::new(conn).lookup(code, customer.id).await?,
        )),
        None => Ok(None),
    }
}

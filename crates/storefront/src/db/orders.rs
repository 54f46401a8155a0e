//! Order persistence: headers, lines and the timeline.
//!
//! Orders are never deleted. Status changes go through [`OrderRepository::lock`]
//! followed by [`OrderRepository::apply_transition`] inside one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use sundry_core::order::{Actor, OrderState, TimelineEntry, Transition};
use sundry_core::pricing::{OrderLine, OrderQuote, QuotedLine};
use sundry_core::{
    ActorKind, CustomerId, Money, OrderId, OrderStatus, PaymentMethod, PaymentStatus, PhoneNumber,
    ProductId, VoucherCode, VoucherId,
};

use super::RepositoryError;
use crate::models::{Order, OrderSummary, Payment, ShippingAddress};

/// Database row type for an order header.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub resume_status: Option<OrderStatus>,
    pub shipping_method: String,
    pub shipping_method_name: String,
    pub voucher_id: Option<VoucherId>,
    pub voucher_code: Option<String>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount: Money,
    pub points_applied: i64,
    pub total_amount: Money,
    pub loyalty_earned: i64,
    pub recipient_name: String,
    pub phone_number: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

impl OrderRow {
    /// The lifecycle-relevant part of the order.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        OrderState {
            status: self.status,
            resume_status: self.resume_status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
        }
    }
}

/// Database row type for order lines.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: ProductId,
    product_name: String,
    image_url: Option<String>,
    unit_price: Money,
    discount_percent: Decimal,
    quantity: i32,
    actual_unit_price: Money,
    line_total: Money,
}

impl TryFrom<OrderLineRow> for QuotedLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative quantity {}", row.quantity))
        })?;

        Ok(Self {
            line: OrderLine {
                product_id: row.product_id,
                product_name: row.product_name,
                image_url: row.image_url,
                unit_price: row.unit_price,
                discount_percent: row.discount_percent,
                quantity,
            },
            actual_unit_price: row.actual_unit_price,
            line_total: row.line_total,
        })
    }
}

/// Database row type for timeline entries.
#[derive(Debug, sqlx::FromRow)]
struct OrderEventRow {
    status: OrderStatus,
    description: String,
    actor_kind: ActorKind,
    actor_name: String,
    created_at: DateTime<Utc>,
}

impl From<OrderEventRow> for TimelineEntry {
    fn from(row: OrderEventRow) -> Self {
        Self {
            status: row.status,
            description: row.description,
            performed_by: Actor {
                user_type: row.actor_kind,
                user_name: row.actor_name,
            },
            timestamp: row.created_at,
        }
    }
}

/// Database row type for the order history list.
#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: OrderId,
    status: OrderStatus,
    item_count: i64,
    total_amount: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    status_changed_at: DateTime<Utc>,
}

/// Everything needed to persist a newly placed order.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub customer_id: CustomerId,
    pub quote: &'a OrderQuote,
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: PaymentMethod,
    pub placed: &'a TimelineEntry,
}

const ORDER_COLUMNS: &str = "id, customer_id, status, resume_status, shipping_method, \
     shipping_method_name, voucher_id, voucher_code, subtotal, shipping_fee, discount, \
     points_applied, total_amount, loyalty_earned, recipient_name, phone_number, province, \
     district, ward, street, payment_method, payment_status, created_at, status_changed_at";

/// Repository for order operations.
pub struct OrderRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> OrderRepository<'c> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert an order with its lines and first timeline entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn insert(&mut self, order: &NewOrder<'_>) -> Result<OrderId, RepositoryError> {
        let quote = order.quote;
        let address = order.shipping_address;

        let id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO customer_order (
                customer_id, status, shipping_method, shipping_method_name,
                voucher_id, voucher_code, subtotal, shipping_fee, discount,
                points_applied, total_amount, recipient_name, phone_number,
                province, district, ward, street, payment_method, payment_status,
                created_at, status_changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $20)
            RETURNING id
            ",
        )
        .bind(order.customer_id)
        .bind(order.placed.status)
        .bind(&quote.shipping_method)
        .bind(&quote.shipping_method_name)
        .bind(quote.voucher_id)
        .bind(quote.voucher_code.as_ref().map(VoucherCode::as_str))
        .bind(quote.subtotal)
        .bind(quote.shipping_fee)
        .bind(quote.discount)
        .bind(quote.points_applied)
        .bind(quote.total_amount)
        .bind(&address.recipient_name)
        .bind(address.phone_number.as_str())
        .bind(&address.province)
        .bind(&address.district)
        .bind(&address.ward)
        .bind(&address.street)
        .bind(order.payment_method)
        .bind(PaymentStatus::Pending)
        .bind(order.placed.timestamp)
        .fetch_one(&mut *self.conn)
        .await?;

        for (position, quoted) in (1_i32..).zip(&quote.order_lines) {
            let quantity = i32::try_from(quoted.line.quantity).map_err(|_| {
                RepositoryError::Conflict(format!("quantity {} is too large", quoted.line.quantity))
            })?;
            sqlx::query(
                r"
                INSERT INTO order_line (
                    order_id, position, product_id, product_name, image_url, unit_price,
                    discount_percent, quantity, actual_unit_price, line_total
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(id)
            .bind(position)
            .bind(quoted.line.product_id)
            .bind(&quoted.line.product_name)
            .bind(quoted.line.image_url.as_deref())
            .bind(quoted.line.unit_price)
            .bind(quoted.line.discount_percent)
            .bind(quantity)
            .bind(quoted.actual_unit_price)
            .bind(quoted.line_total)
            .execute(&mut *self.conn)
            .await?;
        }

        self.insert_event(id, order.placed).await?;
        Ok(id)
    }

    /// Lock an order row for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock(&mut self, id: OrderId) -> Result<Option<OrderRow>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row)
    }

    /// Load the full order document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored values are invalid.
    pub async fn find(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT product_id, product_name, image_url, unit_price, discount_percent,
                   quantity, actual_unit_price, line_total
            FROM order_line
            WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?
        .into_iter()
        .map(QuotedLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let timeline = sqlx::query_as::<_, OrderEventRow>(
            r"
            SELECT status, description, actor_kind, actor_name, created_at
            FROM order_event
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?
        .into_iter()
        .map(TimelineEntry::from)
        .collect();

        into_order(row, lines, timeline).map(Some)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.status, o.total_amount, o.payment_method, o.payment_status,
                   o.created_at, o.status_changed_at,
                   COALESCE((SELECT SUM(l.quantity) FROM order_line l WHERE l.order_id = o.id), 0)::BIGINT
                       AS item_count
            FROM customer_order o
            WHERE o.customer_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(customer_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OrderSummary {
                id: row.id,
                status: row.status,
                status_label: row.status.label(),
                item_count: row.item_count,
                total_amount: row.total_amount,
                payment: Payment {
                    method: row.payment_method,
                    status: row.payment_status,
                },
                can_cancel: row.status.can_cancel(),
                created_at: row.created_at,
                status_changed_at: row.status_changed_at,
            })
            .collect())
    }

    /// Persist a validated transition and append its timeline entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn apply_transition(
        &mut self,
        id: OrderId,
        transition: &Transition,
        loyalty_earned: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customer_order
            SET status = $2,
                resume_status = $3,
                payment_status = $4,
                loyalty_earned = loyalty_earned + $5,
                status_changed_at = CASE WHEN status = $2 THEN status_changed_at ELSE $6 END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(transition.state.status)
        .bind(transition.state.resume_status)
        .bind(transition.state.payment_status)
        .bind(loyalty_earned)
        .bind(transition.entry.timestamp)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.insert_event(id, &transition.entry).await
    }

    /// Unpaid prepaid orders placed before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn awaiting_payment_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            r"
            SELECT id
            FROM customer_order
            WHERE status = 'new'
              AND payment_status = 'pending'
              AND payment_method <> 'cod'
              AND created_at < $1
            ORDER BY created_at
            ",
        )
        .bind(cutoff)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ids)
    }

    /// Orders delivered before `cutoff` and not yet completed.
    ///
    /// Delivery time is the first `delivered` timeline entry. A declined
    /// cancellation request returns the order to `delivered` with a later
    /// entry, which does not restart the clock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delivered_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            r"
            SELECT o.id
            FROM customer_order o
            JOIN LATERAL (
                SELECT MIN(e.created_at) AS delivered_at
                FROM order_event e
                WHERE e.order_id = o.id
                  AND e.status = 'delivered'
            ) d ON TRUE
            WHERE o.status = 'delivered'
              AND d.delivered_at < $1
            ORDER BY d.delivered_at
            ",
        )
        .bind(cutoff)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ids)
    }

    async fn insert_event(&mut self, id: OrderId, entry: &TimelineEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO order_event (order_id, status, description, actor_kind, actor_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(id)
        .bind(entry.status)
        .bind(&entry.description)
        .bind(entry.performed_by.user_type)
        .bind(&entry.performed_by.user_name)
        .bind(entry.timestamp)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }
}

fn into_order(
    row: OrderRow,
    order_lines: Vec<QuotedLine>,
    timeline: Vec<TimelineEntry>,
) -> Result<Order, RepositoryError> {
    let corrupt = |what: &str, e: &dyn std::fmt::Display| {
        RepositoryError::DataCorruption(format!("order {}: invalid {what}: {e}", row.id))
    };
    let phone_number =
        PhoneNumber::parse(&row.phone_number).map_err(|e| corrupt("phone number", &e))?;
    let voucher_code = VoucherCode::parse_optional(row.voucher_code.as_deref())
        .map_err(|e| corrupt("voucher code", &e))?;

    Ok(Order {
        id: row.id,
        customer_id: row.customer_id,
        status: row.status,
        status_label: row.status.label(),
        resume_status: row.resume_status,
        order_lines,
        shipping_method: row.shipping_method,
        shipping_method_name: row.shipping_method_name,
        voucher_code,
        subtotal: row.subtotal,
        shipping_fee: row.shipping_fee,
        discount: row.discount,
        points_applied: row.points_applied,
        total_amount: row.total_amount,
        loyalty_earned: row.loyalty_earned,
        shipping_address: ShippingAddress {
            recipient_name: row.recipient_name,
            phone_number,
            province: row.province,
            district: row.district,
            ward: row.ward,
            street: row.street,
        },
        payment: Payment {
            method: row.payment_method,
            status: row.payment_status,
        },
        timeline,
        can_cancel: row.status.can_cancel(),
        created_at: row.created_at,
        status_changed_at: row.status_changed_at,
    })
}

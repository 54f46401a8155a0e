//! Order history and lifecycle transitions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use sundry_core::order::{self, Actor, OrderAction, customer_cancel_action};
use sundry_core::pricing::loyalty::earned_points;
use sundry_core::{ActorKind, CustomerId, OrderId};

use crate::config::LifecycleConfig;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderSummary};

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    lifecycle: &'a LifecycleConfig,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, lifecycle: &'a LifecycleConfig) -> Self {
        Self { pool, lifecycle }
    }

    /// Fetch an order document, hiding orders that belong to someone else.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist or is not
    /// owned by `customer_id`.
    #[instrument(skip(self))]
    pub async fn get_for_customer(&self, order_id: OrderId, customer_id: CustomerId) -> Result<Order> {
        let order = self.get(order_id).await?;
        if order.customer_id != customer_id {
            return Err(order_not_found(order_id));
        }
        Ok(order)
    }

    /// Fetch an order document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        OrderRepository::new(&mut conn)
            .find(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>> {
        let mut conn = self.pool.acquire().await?;
        Ok(OrderRepository::new(&mut conn)
            .list_for_customer(customer_id)
            .await?)
    }

    /// Move an order through its lifecycle.
    ///
    /// When `owner` is given the order must belong to that customer. A
    /// customer's cancel becomes a cancellation request once the parcel has
    /// left the shop. Point restores and loyalty credits are written in the
    /// same transaction as the status change.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` if the order does not exist or is not the owner's
    /// - `AppError::Transition` if the move is not permitted
    /// - `AppError::Database` if any query fails
    #[instrument(skip(self, actor, note), fields(actor = %actor.user_type))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        owner: Option<CustomerId>,
        action: OrderAction,
        actor: Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = OrderRepository::new(&mut tx)
            .lock(order_id)
            .await?
            .filter(|row| owner.is_none_or(|owner| owner == row.customer_id))
            .ok_or_else(|| order_not_found(order_id))?;

        let action = if action == OrderAction::Cancel && actor.user_type == ActorKind::Customer {
            customer_cancel_action(row.status)
        } else {
            action
        };

        let transition = order::apply(&row.state(), action, actor, note, now)?;

        if transition.effects.restore_points && row.points_applied > 0 {
            CustomerRepository::new(&mut tx)
                .credit_points(row.customer_id, row.points_applied)
                .await?;
        }

        let mut loyalty_earned = 0;
        if transition.effects.credit_loyalty {
            loyalty_earned = earned_points(row.total_amount, self.lifecycle.loyalty_earn_percent);
            if loyalty_earned > 0 {
                CustomerRepository::new(&mut tx)
                    .credit_points(row.customer_id, loyalty_earned)
                    .await?;
            }
        }

        let mut orders = OrderRepository::new(&mut tx);
        orders
            .apply_transition(order_id, &transition, loyalty_earned)
            .await?;
        let order = orders
            .find(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            action = %action,
            from = %transition.from,
            to = %transition.state.status,
            points_restored = transition.effects.restore_points.then_some(row.points_applied),
            loyalty_earned,
            "Order status changed"
        );
        Ok(order)
    }
}

fn order_not_found(order_id: OrderId) -> AppError {
    AppError::NotFound(format!("Order {order_id}"))
}

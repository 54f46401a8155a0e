//! Customer order handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use sundry_core::OrderId;
use sundry_core::order::OrderAction;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::{Order, OrderSummary};
use crate::routes::ApiPath;
use crate::services::OrderService;
use crate::state::AppState;

/// Optional free-text reason attached to a customer action.
///
/// The body itself is optional; requests without a JSON content type carry no note.
#[derive(Debug, Default, Deserialize)]
pub struct ActionNote {
    #[serde(default)]
    pub note: Option<String>,
}

/// The customer's orders.
///
/// GET /api/orders
pub async fn index(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderService::new(state.pool(), state.lifecycle())
        .list_for_customer(customer.id)
        .await?;
    Ok(Json(orders))
}

/// A single order with its timeline.
///
/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.lifecycle())
        .get_for_customer(id, customer.id)
        .await?;
    Ok(Json(order))
}

/// Cancel an order, or ask the shop to once it has shipped.
///
/// PATCH /api/orders/{id}/cancel
pub async fn cancel(
    state: State<AppState>,
    customer: RequireCustomer,
    id: ApiPath<OrderId>,
    body: Option<Json<ActionNote>>,
) -> Result<Json<Order>> {
    act(state, customer, id, OrderAction::Cancel, body).await
}

/// Confirm a delivered order was received.
///
/// PATCH /api/orders/{id}/confirm-receipt
pub async fn confirm_receipt(
    state: State<AppState>,
    customer: RequireCustomer,
    id: ApiPath<OrderId>,
    body: Option<Json<ActionNote>>,
) -> Result<Json<Order>> {
    act(state, customer, id, OrderAction::ConfirmReceipt, body).await
}

/// Ask for a return after a failed delivery.
///
/// PATCH /api/orders/{id}/return
pub async fn request_return(
    state: State<AppState>,
    customer: RequireCustomer,
    id: ApiPath<OrderId>,
    body: Option<Json<ActionNote>>,
) -> Result<Json<Order>> {
    act(state, customer, id, OrderAction::RequestReturn, body).await
}

#[instrument(skip_all, fields(order_id = %id, customer_id = %customer.id, action = %action))]
async fn act(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    ApiPath(id): ApiPath<OrderId>,
    action: OrderAction,
    body: Option<Json<ActionNote>>,
) -> Result<Json<Order>> {
    let note = body.and_then(|Json(body)| body.note);
    let order = OrderService::new(state.pool(), state.lifecycle())
        .transition(
            id,
            Some(customer.id),
            action,
            customer.actor(),
            note.as_deref(),
            state.now(),
        )
        .await?;
    Ok(Json(order))
}

//! Shop staff handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use sundry_core::order::OrderAction;
use sundry_core::{CustomerId, OrderId, VoucherCode};

use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{Order, SavedVoucher};
use crate::routes::{ApiJson, ApiPath};
use crate::services::{OrderService, WalletService};
use crate::state::AppState;

/// Status update request.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub action: OrderAction,
    #[serde(default)]
    pub note: Option<String>,
}

/// Apply a shop action to any order.
///
/// PATCH /api/shop/orders/{id}/status
#[instrument(skip_all, fields(order_id = %id, staff = %staff.name, action = %update.action))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.lifecycle())
        .transition(
            id,
            None,
            update.action,
            staff.actor(),
            update.note.as_deref(),
            state.now(),
        )
        .await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherGrant {
    pub customer_id: CustomerId,
}

/// Issue a voucher to a customer's wallet.
///
/// POST /api/shop/vouchers/{code}/grant
///
/// Responds 201 when newly issued and 200 when the customer already held it.
#[instrument(skip_all, fields(staff = %staff.name, code = %code, customer_id = %grant.customer_id))]
pub async fn grant_voucher(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiPath(code): ApiPath<String>,
    ApiJson(grant): ApiJson<VoucherGrant>,
) -> Result<(StatusCode, Json<SavedVoucher>)> {
    let code = VoucherCode::parse(&code).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let (saved, inserted) = WalletService::new(state.pool())
        .grant(&staff, grant.customer_id, &code, state.now())
        .await?;
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(saved)))
}

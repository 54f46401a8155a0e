//! Voucher wallet handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use sundry_core::VoucherCode;

use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::SavedVoucher;
use crate::routes::ApiPath;
use crate::services::WalletService;
use crate::state::AppState;

/// Save a voucher to the wallet.
///
/// POST /api/vouchers/{code}/save
///
/// Responds 201 when newly saved and 200 when it was already there.
#[instrument(skip_all, fields(customer_id = %customer.id, code = %code))]
pub async fn save(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    ApiPath(code): ApiPath<String>,
) -> Result<(StatusCode, Json<SavedVoucher>)> {
    let code = VoucherCode::parse(&code).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let (saved, inserted) = WalletService::new(state.pool())
        .save(&customer, &code, state.now())
        .await?;
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(saved)))
}

/// The customer's saved vouchers.
///
/// GET /api/vouchers/saved
pub async fn saved(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<Vec<SavedVoucher>>> {
    let saved = WalletService::new(state.pool())
        .list(&customer, state.now())
        .await?;
    Ok(Json(saved))
}

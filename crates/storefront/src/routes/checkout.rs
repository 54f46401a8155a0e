//! Checkout handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::{CreateOrderRequest, CreatedOrder, PreviewRequest, PreviewResponse};
use crate::routes::ApiJson;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Price the selection without side effects.
///
/// POST /api/orders/preview
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn preview(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    ApiJson(request): ApiJson<PreviewRequest>,
) -> Result<Json<PreviewResponse>> {
    let response = CheckoutService::new(state.pool())
        .preview(&customer, request, state.now())
        .await?;
    Ok(Json(response))
}

/// Place an order from a confirmed preview.
///
/// POST /api/orders
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreatedOrder>)> {
    let created = CheckoutService::new(state.pool())
        .place_order(&customer, request, state.now())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

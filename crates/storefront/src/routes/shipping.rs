//! Shipping catalog handler.

use axum::{Json, extract::State};

use sundry_core::pricing::ShippingMethod;

use crate::db::CatalogRepository;
use crate::error::Result;
use crate::state::AppState;

/// Active shipping methods in display order.
///
/// GET /api/shipping-methods
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ShippingMethod>>> {
    let mut conn = state.pool().acquire().await?;
    let catalog = CatalogRepository::new(&mut conn).shipping_catalog().await?;
    Ok(Json(catalog.active().cloned().collect()))
}

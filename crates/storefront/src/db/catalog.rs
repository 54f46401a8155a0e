//! Product prices and the shipping catalog.
//!
//! The product catalog itself is managed elsewhere; checkout only reads the
//! current price, discount and display fields.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use sundry_core::pricing::{ShippingCatalog, ShippingMethod};
use sundry_core::{Money, ProductId};

use super::RepositoryError;

/// A product as priced at checkout.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Money,
    pub discount_percent: Decimal,
    pub is_active: bool,
}

/// Repository for catalog reads.
pub struct CatalogRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> CatalogRepository<'c> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Load the given products. Unknown IDs are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&mut self, ids: &[ProductId]) -> Result<Vec<ProductRow>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image_url, price, discount_percent, is_active
            FROM product
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    /// Load every shipping method, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shipping_catalog(&mut self) -> Result<ShippingCatalog, RepositoryError> {
        let methods = sqlx::query_as::<_, ShippingMethod>(
            r"
            SELECT code, name, fee, is_active, sort_order
            FROM shipping_method
            ORDER BY sort_order, code
            ",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ShippingCatalog::new(methods))
    }
}

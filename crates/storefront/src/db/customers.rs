//! Customer loyalty balances.

use sqlx::PgConnection;

use sundry_core::CustomerId;

use super::RepositoryError;

/// Repository for customer balance operations.
pub struct CustomerRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> CustomerRepository<'c> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Make sure a row exists for a customer known to the auth gateway.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure(&mut self, id: CustomerId, name: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO customer (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(id)
        .bind(name)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Current loyalty balance, zero for customers without a row yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn loyalty_balance(&mut self, id: CustomerId) -> Result<i64, RepositoryError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT loyalty_points FROM customer WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(balance.unwrap_or(0))
    }

    /// Lock the customer row for the rest of the transaction and read the balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn lock_balance(&mut self, id: CustomerId) -> Result<i64, RepositoryError> {
        sqlx::query_scalar("SELECT loyalty_points FROM customer WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Debit points if the balance covers them.
    ///
    /// Returns `false` (and changes nothing) when it does not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn debit_points(&mut self, id: CustomerId, points: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customer
            SET loyalty_points = loyalty_points - $2, updated_at = now()
            WHERE id = $1 AND loyalty_points >= $2
            ",
        )
        .bind(id)
        .bind(points)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Credit points, e.g. on completion or when a redemption is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn credit_points(&mut self, id: CustomerId, points: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customer
            SET loyalty_points = loyalty_points + $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(points)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

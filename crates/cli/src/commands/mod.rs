//! CLI command implementations.

pub mod migrate;
pub mod orders;
pub mod vouchers;

use secrecy::SecretString;
use sqlx::PgPool;

use sundry_storefront::config::ConfigError;
use sundry_storefront::db::RepositoryError;

/// Errors shared by all commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Storefront(#[from] sundry_storefront::error::AppError),
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `CliError` if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    let _ = dotenvy::dotenv();

    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(sundry_storefront::db::create_pool(&SecretString::from(url)).await?)
}

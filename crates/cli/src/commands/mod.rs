//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] signcraft_storefront::db::RepositoryError),

    #[error("{0}")]
    Auth(#[from] signcraft_storefront::services::auth::AuthError),

    /// Command-line argument rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Connect to the storefront database.
///
/// Reads `SIGNCRAFT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<sqlx::PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("SIGNCRAFT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("SIGNCRAFT_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(signcraft_storefront::db::create_pool(&database_url).await?)
}

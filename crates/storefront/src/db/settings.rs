//! Settings database operations.
//!
//! Settings are JSONB values keyed by name. The only key the API writes
//! today is [`PRICING_KEY`].

use serde_json::Value as JsonValue;
use signcraft_core::pricing::PricingConfig;
use sqlx::PgPool;

use super::RepositoryError;

/// Key of the pricing rate table.
pub const PRICING_KEY: &str = "pricing";

/// Get a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
    let result = sqlx::query_scalar::<_, JsonValue>("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(result)
}

/// Insert or replace a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(
    pool: &PgPool,
    key: &str,
    value: &JsonValue,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the stored pricing table, if one has been saved.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the stored value does not
/// decode as a `PricingConfig`.
pub async fn get_pricing(pool: &PgPool) -> Result<Option<PricingConfig>, RepositoryError> {
    get_setting(pool, PRICING_KEY)
        .await?
        .map(|value| {
            serde_json::from_value(value).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid pricing setting: {e}"))
            })
        })
        .transpose()
}

/// Save the pricing table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_pricing(pool: &PgPool, config: &PricingConfig) -> Result<(), RepositoryError> {
    let value = serde_json::to_value(config)
        .map_err(|e| RepositoryError::DataCorruption(format!("unencodable pricing: {e}")))?;
    set_setting(pool, PRICING_KEY, &value).await
}

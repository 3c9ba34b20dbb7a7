//! Seed the database with the default pricing table.
//!
//! The API falls back to these defaults when nothing is stored, so seeding
//! only matters for editing the table in place.

use signcraft_storefront::db::settings;
use signcraft_storefront::services::pricing::PricingService;

use super::{CommandError, connect};

/// Write the default pricing table.
///
/// # Arguments
///
/// * `home_country` - Seller country the VAT rules are based on
/// * `overwrite` - Replace a table that is already stored
///
/// # Errors
///
/// Returns an error if the country code is invalid or database operations fail.
pub async fn pricing(home_country: &str, overwrite: bool) -> Result<(), CommandError> {
    let home_country = home_country.to_ascii_uppercase();
    if !signcraft_storefront::services::auth::is_country_code(&home_country) {
        return Err(CommandError::InvalidArgument(format!(
            "invalid country code: {home_country}"
        )));
    }

    let pool = connect().await?;

    if !overwrite && settings::get_pricing(&pool).await?.is_some() {
        tracing::warn!("Pricing table already stored, pass --overwrite to replace it");
        return Ok(());
    }

    let config = PricingService::new(&home_country).default_config();
    settings::set_pricing(&pool, &config).await?;

    tracing::info!(home_country = %home_country, "Default pricing table stored");
    Ok(())
}

//! Server-side pricing.
//!
//! The rate table lives in the `settings` table and is cached in memory for
//! one minute. Cart submissions are always repriced here from the submitted
//! canvas JSON; client-side totals are never trusted.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;

use signcraft_core::api::CartCanvasInput;
use signcraft_core::canvas::{CanvasError, import_value};
use signcraft_core::pricing::{
    AccessoryLine, CustomerContext, PriceQuote, PricingConfig, PricingError, SignGeometry,
    SignLine, quote, unit_price,
};

use crate::db::RepositoryError;
use crate::db::settings;
use crate::models::CartCanvas;

/// Upper bound on copies of one canvas in a single order.
pub const MAX_COPIES: u32 = 10_000;

const CONFIG_KEY: &str = "pricing";

/// Errors from repricing submitted canvases.
///
/// Per-canvas failures carry the canvas index so the editor can point at it.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Nothing to price.
    #[error("cart must contain at least one canvas")]
    Empty,

    /// Canvas at `index` could not be loaded.
    #[error("canvas {index}: {source}")]
    Canvas {
        index: usize,
        #[source]
        source: CanvasError,
    },

    /// Canvas at `index` could not be priced.
    #[error("canvas {index}: {source}")]
    CanvasPricing {
        index: usize,
        #[source]
        source: PricingError,
    },

    /// Cart-level pricing failed (accessories, quantities).
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Canvases and quote after server-side pricing.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub canvases: Vec<CartCanvas>,
    pub quote: PriceQuote,
}

/// Loads, caches and applies the rate table.
#[derive(Clone)]
pub struct PricingService {
    cache: Cache<&'static str, Arc<PricingConfig>>,
    home_country: String,
}

impl std::fmt::Debug for PricingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingService")
            .field("home_country", &self.home_country)
            .finish_non_exhaustive()
    }
}

impl PricingService {
    #[must_use]
    pub fn new(home_country: &str) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self {
            cache,
            home_country: home_country.to_ascii_uppercase(),
        }
    }

    /// Built-in table, with VAT anchored to the configured seller country.
    #[must_use]
    pub fn default_config(&self) -> PricingConfig {
        let mut config = PricingConfig::default();
        config.vat.home_country.clone_from(&self.home_country);
        config
    }

    /// Current rate table: the stored one, or the built-in default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings row cannot be read or decoded.
    pub async fn config(&self, pool: &PgPool) -> Result<Arc<PricingConfig>, RepositoryError> {
        if let Some(config) = self.cache.get(CONFIG_KEY).await {
            return Ok(config);
        }

        let config = match settings::get_pricing(pool).await? {
            Some(config) => config,
            None => {
                tracing::debug!("No stored pricing table, using defaults");
                self.default_config()
            }
        };
        let config = Arc::new(config);
        self.cache.insert(CONFIG_KEY, Arc::clone(&config)).await;
        Ok(config)
    }

    /// Validate and store a new rate table.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidConfig` (wrapped) if the table is
    /// inconsistent, or a repository error if it cannot be saved.
    pub async fn store(
        &self,
        pool: &PgPool,
        config: PricingConfig,
    ) -> Result<Arc<PricingConfig>, StoreConfigError> {
        let config = config.normalized();
        config.validate()?;
        settings::set_pricing(pool, &config).await?;

        let config = Arc::new(config);
        self.cache.insert(CONFIG_KEY, Arc::clone(&config)).await;
        tracing::info!(materials = config.materials.len(), "Pricing table updated");
        Ok(config)
    }
}

/// Errors from saving a rate table.
#[derive(Debug, Error)]
pub enum StoreConfigError {
    #[error(transparent)]
    Invalid(#[from] PricingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reprice submitted canvases.
///
/// Each canvas is sanitized and its QR paths regenerated before measuring,
/// so the stored snapshot is exactly what was priced.
///
/// # Errors
///
/// Returns `QuoteError` for an empty cart, an unreadable canvas, an unknown
/// material, zero or excessive copies, or invalid accessories.
pub fn price_cart(
    inputs: &[CartCanvasInput],
    accessories: &[AccessoryLine],
    config: &PricingConfig,
    customer: &CustomerContext,
) -> Result<PricedCart, QuoteError> {
    if inputs.is_empty() {
        return Err(QuoteError::Empty);
    }

    let mut lines = Vec::with_capacity(inputs.len());
    let mut sanitized = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        if input.copies_count == 0 || input.copies_count > MAX_COPIES {
            return Err(QuoteError::CanvasPricing {
                index,
                source: PricingError::InvalidQuantity(format!(
                    "copies must be between 1 and {MAX_COPIES}"
                )),
            });
        }

        let imported = import_value(input.canvas.clone())
            .map_err(|source| QuoteError::Canvas { index, source })?;
        for warning in &imported.warnings {
            tracing::warn!(
                canvas = index,
                object = ?warning.object_path,
                message = %warning.message,
                "QR code could not be regenerated"
            );
        }

        let geometry = SignGeometry::from_canvas(&imported.snapshot, input.thickness_mm, input.tape)
            .map_err(|source| QuoteError::CanvasPricing { index, source })?;
        unit_price(&geometry, config)
            .map_err(|source| QuoteError::CanvasPricing { index, source })?;
        let canvas = serde_json::to_value(&imported.snapshot).map_err(|e| QuoteError::Canvas {
            index,
            source: CanvasError::InvalidJson(e),
        })?;

        lines.push(SignLine {
            geometry,
            copies: input.copies_count,
        });
        sanitized.push(canvas);
    }

    let quote = quote(&lines, accessories, config, customer)?;

    let canvases = inputs
        .iter()
        .zip(sanitized)
        .zip(&quote.lines)
        .map(|((input, canvas), price)| CartCanvas {
            canvas,
            preview_svg: input.preview_svg.clone(),
            copies_count: input.copies_count,
            thickness_mm: input.thickness_mm,
            tape: input.tape,
            price: price.clone(),
        })
        .collect();

    Ok(PricedCart { canvases, quote })
}

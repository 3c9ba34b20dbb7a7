//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::JwtManager;
use crate::services::email::EmailService;
use crate::services::icons::IconLibrary;
use crate::services::pdf::ChromiumPdfRenderer;
use crate::services::pricing::PricingService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    jwt: JwtManager,
    pricing: PricingService,
    icons: IconLibrary,
    email: Option<EmailService>,
    pdf: Option<ChromiumPdfRenderer>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email is enabled when SMTP credentials are configured; PDF rendering
    /// when a browser binary is configured. Both are optional.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let jwt = JwtManager::new(&config.jwt);
        let pricing = PricingService::new(&config.home_country);
        let icons = IconLibrary::new(&config.icons_dir);

        let email = config
            .email
            .as_ref()
            .and_then(|email_config| match EmailService::new(email_config) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!(error = %e, "SMTP relay misconfigured, emails disabled");
                    None
                }
            });
        if email.is_none() {
            tracing::info!("Order confirmation emails disabled");
        }

        let pdf = config.chrome_bin.as_ref().map(ChromiumPdfRenderer::new);
        if pdf.is_none() {
            tracing::info!("SIGNCRAFT_CHROME_BIN not set, PDF endpoints will return 503");
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                pricing,
                icons,
                email,
                pdf,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Token issuer/validator.
    #[must_use]
    pub fn jwt(&self) -> &JwtManager {
        &self.inner.jwt
    }

    /// Cached pricing table.
    #[must_use]
    pub fn pricing(&self) -> &PricingService {
        &self.inner.pricing
    }

    #[must_use]
    pub fn icons(&self) -> &IconLibrary {
        &self.inner.icons
    }

    /// Email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// PDF renderer, if a browser is configured.
    #[must_use]
    pub fn pdf(&self) -> Option<&ChromiumPdfRenderer> {
        self.inner.pdf.as_ref()
    }
}

//! HTTP client for the SignCraft API.
//!
//! Wraps the endpoints the editor needs: account login, the pricing rate
//! table, templates, icons and the cart. The bearer token from the last
//! successful login is kept in memory and attached to every request.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use signcraft_core::api::{
    AddToCartRequest, AuthResponse, CartCanvasInput, CartEntry, ErrorBody, IconView, LoginRequest,
    OrderSummary, QuoteRequest, RegisterRequest, TemplateView, UserProfile,
};
use signcraft_core::pricing::{PriceQuote, PricingConfig};
use signcraft_core::{OrderId, TemplateCategoryId};
use thiserror::Error;
use url::Url;

use crate::config::EditorConfig;
use crate::store::Project;

#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API rejected our credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The call needs a login first.
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SignCraft API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &EditorConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("signcraft-editor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Use a token obtained elsewhere (e.g. restored from disk).
    pub fn set_token(&self, token: SecretString) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn logout(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Create an account and log in as it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 for a taken email.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let response: AuthResponse = self.post("auth/register", request).await?;
        self.set_token(SecretString::from(response.token));
        Ok(response.user)
    }

    /// Log in and remember the token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` for bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response: AuthResponse = self.post("auth/login", &request).await?;
        self.set_token(SecretString::from(response.token));
        tracing::info!(user_id = %response.user.id, "Logged in");
        Ok(response.user)
    }

    /// Profile of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a token.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.get("auth/me").await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Current rate table.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn pricing_config(&self) -> Result<PricingConfig, ClientError> {
        self.get("pricing/config").await
    }

    /// Server-side quote, for comparing with the live price.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<PriceQuote, ClientError> {
        self.post("pricing/quote", request).await
    }

    /// Templates, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn templates(
        &self,
        category: Option<TemplateCategoryId>,
    ) -> Result<Vec<TemplateView>, ClientError> {
        match category {
            Some(id) => self.get(&format!("templates?category={id}")).await,
            None => self.get("templates").await,
        }
    }

    /// Available icon assets.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn icons(&self) -> Result<Vec<IconView>, ClientError> {
        self.get("icons").await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Order a project. The server reprices it from the canvases.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a token, or any API
    /// error (e.g. 400 for an unknown material).
    pub async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<CartEntry, ClientError> {
        self.post("cart", request).await
    }

    /// Orders of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn orders(&self) -> Result<Vec<OrderSummary>, ClientError> {
        self.get("cart").await
    }

    /// One order with its stored project.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or API failure.
    pub async fn order(&self, id: OrderId) -> Result<CartEntry, ClientError> {
        self.get(&format!("cart/{id}")).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match token.as_ref() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.authorize(self.inner.client.get(self.url(path)?));
        let response = request.send().await?;
        handle_response(response, self.is_authenticated()).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.authorize(self.inner.client.post(self.url(path)?).json(body));
        let response = request.send().await?;
        handle_response(response, self.is_authenticated()).await
    }
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    authenticated: bool,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map_or_else(|_| status.to_string(), |body| body.message);

    if status == reqwest::StatusCode::UNAUTHORIZED {
        if !authenticated {
            return Err(ClientError::NotAuthenticated);
        }
        return Err(ClientError::Unauthorized(message));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Build the cart request for a stored project.
///
/// # Errors
///
/// Returns `ClientError::Serialization` if a canvas cannot be encoded.
pub fn cart_request(
    project: &Project,
    country: Option<String>,
) -> Result<AddToCartRequest, ClientError> {
    let canvases = project
        .canvases
        .iter()
        .map(|entry| {
            Ok(CartCanvasInput {
                canvas: serde_json::to_value(&entry.canvas)?,
                preview_svg: entry.preview_svg.clone(),
                copies_count: entry.copies_count,
                thickness_mm: entry.toolbar.thickness_mm,
                tape: entry.toolbar.tape,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    Ok(AddToCartRequest {
        project_name: project.name.clone(),
        canvases,
        accessories: project.accessories.clone(),
        country,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::ProjectCanvas;
    use signcraft_core::canvas::CanvasSnapshot;

    #[test]
    fn test_cart_request_carries_copies_and_material() {
        let mut project = Project::new("Doors");
        let mut entry = ProjectCanvas::new(CanvasSnapshot::blank(400.0, 300.0));
        entry.copies_count = 3;
        entry.toolbar.tape = true;
        project.canvases.push(entry);
        project
            .canvases
            .push(ProjectCanvas::new(CanvasSnapshot::blank(200.0, 100.0)));

        let request = cart_request(&project, Some("PL".to_owned())).unwrap();

        assert_eq!(request.project_name, "Doors");
        assert_eq!(request.canvases.len(), 2);
        assert_eq!(request.canvases[0].copies_count, 3);
        assert!(request.canvases[0].tape);
        assert_eq!(request.canvases[1].canvas["width"], 200.0);
        assert_eq!(request.country.as_deref(), Some("PL"));
    }

    #[test]
    fn test_token_lifecycle() {
        let client = ApiClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:4000/").unwrap(),
        );
        assert!(!client.is_authenticated());
        client.set_token(SecretString::from("abc".to_owned()));
        assert!(client.is_authenticated());
        client.logout();
        assert!(!client.is_authenticated());
        assert!(!format!("{client:?}").contains("abc"));
    }

    #[test]
    fn test_urls_are_relative_to_base() {
        let client = ApiClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://api.example.com/v1/").unwrap(),
        );
        assert_eq!(
            client.url("cart/getPdfs/1").unwrap().as_str(),
            "https://api.example.com/v1/cart/getPdfs/1"
        );
    }
}

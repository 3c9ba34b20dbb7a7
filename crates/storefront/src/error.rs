//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses are JSON: `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use signcraft_core::api::ErrorBody;
use signcraft_core::pricing::PricingError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::icons::IconError;
use crate::services::pdf::DocumentError;
use crate::services::pricing::{QuoteError, StoreConfigError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Price computation rejected the input.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Invoice or delivery note could not be produced.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required backing service is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::UserNotFound
                | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
                AuthError::ForbiddenUserType(_) => StatusCode::FORBIDDEN,
                AuthError::Repository(err) => repository_status(err),
                AuthError::TokenSigning(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Pricing(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Document(err) => match err {
                DocumentError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                DocumentError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                DocumentError::Render(_) | DocumentError::Io(_) | DocumentError::Template(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) | AuthError::InvalidProfile(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::ForbiddenUserType(kind) => {
                    format!("{kind} accounts cannot be registered")
                }
                AuthError::InvalidToken(_) => "Invalid or expired token".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::Pricing(err) => err.to_string(),
            Self::Document(DocumentError::Unavailable) => {
                "PDF rendering is not available".to_string()
            }
            Self::Document(DocumentError::Timeout(_)) => "PDF rendering timed out".to_string(),
            Self::Document(_) => "Document could not be generated".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Unavailable(msg) => msg.clone(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StoreConfigError> for AppError {
    fn from(err: StoreConfigError) -> Self {
        match err {
            StoreConfigError::Invalid(e) => Self::Pricing(e),
            StoreConfigError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<IconError> for AppError {
    fn from(err: IconError) -> Self {
        match err {
            IconError::NotFound => Self::NotFound("Icon not found".to_string()),
            IconError::InvalidName => Self::BadRequest("Invalid icon name".to_string()),
            IconError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Order placed", Some(&[("order_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("template".to_string());
        assert_eq!(err.to_string(), "Not found: template");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wrapped_error_status_codes() {
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::WeakPassword("short".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::Repository(RepositoryError::NotFound).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("category already exists".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(DocumentError::Unavailable.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(QuoteError::Empty.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_body_hides_internal_details() {
        let response = AppError::Internal("connection refused at 10.0.0.3".to_string())
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal server error");
    }
}

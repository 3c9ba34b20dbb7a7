//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <jwt>`. Tokens are
//! validated statelessly against the configured secret.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use signcraft_core::api::ErrorBody;

use crate::error::set_sentry_user;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token of an admin account.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when authentication or authorization fails.
#[derive(Debug)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token present but invalid or expired.
    InvalidToken,
    /// Authenticated, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (
            status,
            Json(ErrorBody {
                message: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// Pull the token out of an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
    let user = state.jwt().authenticate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthRejection::InvalidToken
    })?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin on admin route");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/cart");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}

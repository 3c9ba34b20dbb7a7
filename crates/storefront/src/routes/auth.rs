//! Account route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use signcraft_core::api::{AuthResponse, LoginRequest, ProfileFields, RegisterRequest, UserProfile};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse> {
    Ok(AuthResponse {
        token: state.jwt().generate_token(user)?,
        user: user.to_profile(),
    })
}

/// Create an account and return a token for it.
#[instrument(skip(state, request), fields(email = %request.email, user_type = %request.user_type))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).register(&request).await?;
    add_breadcrumb("auth", "Registered", None);
    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// Exchange email and password for a token.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(auth_response(&state, &user)?))
}

/// Current user's profile.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(user.to_profile()))
}

/// Replace the current user's profile and billing details.
#[instrument(skip(state, user, profile), fields(user_id = %user.id))]
pub async fn update_me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(profile): Json<ProfileFields>,
) -> Result<Json<UserProfile>> {
    let user = AuthService::new(state.pool())
        .update_profile(user.id, profile)
        .await?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user.to_profile()))
}

//! User management commands.
//!
//! Admin accounts cannot be registered over HTTP; they are created or
//! promoted here.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin account
//! sc-cli user create -e admin@example.com -p 'long-password' --user-type admin
//!
//! # Promote an existing account
//! sc-cli user promote -e someone@example.com
//! ```

use signcraft_core::api::ProfileFields;
use signcraft_core::{Email, UserId, UserType};
use signcraft_storefront::db::UserRepository;
use signcraft_storefront::services::auth::AuthService;

use super::{CommandError, connect};

/// Create a new account.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the user type is unknown, the email or password is
/// rejected, or the email is already registered.
pub async fn create(email: &str, password: &str, user_type: &str) -> Result<UserId, CommandError> {
    let user_type: UserType = user_type.parse().map_err(CommandError::InvalidArgument)?;

    let pool = connect().await?;
    let user = AuthService::new(&pool)
        .create_user(email, password, user_type, ProfileFields::default())
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Type: {}",
        user.id,
        user.email,
        user.user_type
    );
    Ok(user.id)
}

/// Give an existing account admin rights.
///
/// # Errors
///
/// Returns an error if the email is invalid or no account uses it.
pub async fn promote(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .set_user_type(&email, UserType::Admin)
        .await?;

    tracing::info!("Promoted {} (ID: {}) to admin", user.email, user.id);
    Ok(())
}

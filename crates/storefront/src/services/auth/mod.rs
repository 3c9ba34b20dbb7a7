//! Authentication service.
//!
//! Email/password accounts with argon2id hashes, and stateless HS256 bearer
//! tokens issued on register/login.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtManager};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use signcraft_core::api::{ProfileFields, RegisterRequest};
use signcraft_core::{Email, UserId, UserType};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles user registration, login and profile updates.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::ForbiddenUserType` for admin self-registration.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        if request.user_type.is_admin() {
            return Err(AuthError::ForbiddenUserType(request.user_type));
        }
        self.create_user(
            &request.email,
            &request.password,
            request.user_type,
            normalize_profile(request.profile.clone())?,
        )
        .await
    }

    /// Create an account of any kind (used by the CLI for admins).
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`], without the user type restriction.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        user_type: UserType,
        profile: ProfileFields,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&NewUser {
                email,
                password_hash,
                user_type,
                profile,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, user_type = %user.user_type, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Replace the profile and billing fields of a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        profile: ProfileFields,
    ) -> Result<User, AuthError> {
        self.users
            .update_profile(user_id, &normalize_profile(profile)?)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Trim fields, drop empty ones and check the country code.
fn normalize_profile(profile: ProfileFields) -> Result<ProfileFields, AuthError> {
    fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    let country = clean(profile.country).map(|c| c.to_ascii_uppercase());
    if let Some(code) = &country
        && !is_country_code(code)
    {
        return Err(AuthError::InvalidProfile(format!(
            "country must be a two-letter code, got {code:?}"
        )));
    }

    Ok(ProfileFields {
        first_name: clean(profile.first_name),
        last_name: clean(profile.last_name),
        phone: clean(profile.phone),
        company: clean(profile.company),
        vat_number: clean(profile.vat_number),
        street: clean(profile.street),
        city: clean(profile.city),
        postcode: clean(profile.postcode),
        country,
    })
}

/// ISO 3166-1 alpha-2 shape: two ASCII letters.
#[must_use]
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.trim().is_empty() {
        return Err(AuthError::WeakPassword(
            "password must not be blank".to_owned(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] signcraft_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Profile field fails validation (e.g. country code).
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// Registration asked for an account kind that cannot self-register.
    #[error("user type {0} cannot be registered")]
    ForbiddenUserType(signcraft_core::UserType),

    /// Bearer token is missing, malformed, expired or badly signed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

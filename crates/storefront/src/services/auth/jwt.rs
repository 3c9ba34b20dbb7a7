//! Bearer token issuing and verification (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use signcraft_core::{Email, UserId, UserType};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::{CurrentUser, User};

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID as a decimal string.
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    pub exp: i64,
    pub iat: i64,
    /// Unique token ID.
    pub jti: String,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn generate_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            user_type: user.user_type,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::TokenSigning)
    }

    /// Verify a token and decode its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for bad signatures, expired tokens
    /// and malformed claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Verify a token and return the caller it identifies.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate_token`], plus `AuthError::InvalidToken` if
    /// `sub` or `email` do not parse.
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.validate_token(token)?;
        let id = claims
            .sub
            .parse::<UserId>()
            .map_err(|e| AuthError::InvalidToken(format!("invalid subject: {e}")))?;
        let email = Email::parse(&claims.email)
            .map_err(|e| AuthError::InvalidToken(format!("invalid email claim: {e}")))?;

        Ok(CurrentUser {
            id,
            email,
            user_type: claims.user_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use signcraft_core::api::ProfileFields;

    fn manager(ttl_hours: i64) -> JwtManager {
        JwtManager::new(&JwtConfig {
            secret: SecretString::from("kX9#mQ2$vL7!pR4@wT8^zB3&nF6*hJ1%"),
            ttl_hours,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(42),
            email: Email::parse("maker@example.com").unwrap(),
            user_type: UserType::Business,
            profile: ProfileFields::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = manager(24);
        let token = jwt.generate_token(&user()).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "maker@example.com");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert!(Uuid::parse_str(&claims.jti).is_ok());

        let current = jwt.authenticate(&token).unwrap();
        assert_eq!(current.id, UserId::new(42));
        assert_eq!(current.user_type, UserType::Business);
    }

    #[test]
    fn test_each_token_has_unique_id() {
        let jwt = manager(24);
        let a = jwt.validate_token(&jwt.generate_token(&user()).unwrap()).unwrap();
        let b = jwt.validate_token(&jwt.generate_token(&user()).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let token = manager(24).generate_token(&user()).unwrap();
        let other = JwtManager::new(&JwtConfig {
            secret: SecretString::from("Zq8!Lw3@Xe5#Rt7$Yu9%Io2^Pa4&Sd6*"),
            ttl_hours: 24,
        });
        assert!(matches!(
            other.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(manager(24).authenticate("not.a.token").is_err());
    }
}

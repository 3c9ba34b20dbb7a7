//! User repository for database operations.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` rows) so the
//! crate builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use signcraft_core::api::ProfileFields;
use signcraft_core::{Email, UserId, UserType};

use super::RepositoryError;
use crate::models::user::{NewUser, User};

const USER_COLUMNS: &str = "id, email, user_type, first_name, last_name, phone, company, \
     vat_number, street, city, postcode, country, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    user_type: UserType,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    vat_number: Option<String>,
    street: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            email,
            user_type: r.user_type,
            profile: ProfileFields {
                first_name: r.first_name,
                last_name: r.last_name,
                phone: r.phone,
                company: r.company,
                vat_number: r.vat_number,
                street: r.street,
                city: r.city,
                postcode: r.postcode,
                country: r.country,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, PasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// Create a new user with a password hash and profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let p = &user.profile;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (email, password_hash, user_type, first_name, last_name, phone,
                               company, vat_number, street, city, postcode, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.user_type)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(&p.phone)
        .bind(&p.company)
        .bind(&p.vat_number)
        .bind(&p.street)
        .bind(&p.city)
        .bind(&p.postcode)
        .bind(&p.country)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email"))?;

        User::try_from(row)
    }

    /// Replace a user's profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        profile: &ProfileFields,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET first_name = $2, last_name = $3, phone = $4, company = $5, vat_number = $6,
                street = $7, city = $8, postcode = $9, country = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone)
        .bind(&profile.company)
        .bind(&profile.vat_number)
        .bind(&profile.street)
        .bind(&profile.city)
        .bind(&profile.postcode)
        .bind(&profile.country)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Change the account kind (e.g. promote to admin).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    pub async fn set_user_type(
        &self,
        email: &Email,
        user_type: UserType,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET user_type = $2, updated_at = NOW()
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(user_type)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }
}

//! User domain types.

use chrono::{DateTime, Utc};

use signcraft_core::api::{ProfileFields, UserProfile};
use signcraft_core::{Email, UserId, UserType};

/// A customer or staff account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Consumer, business or admin.
    pub user_type: UserType,
    /// Name, company and billing address.
    pub profile: ProfileFields,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view for API responses.
    #[must_use]
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.to_string(),
            user_type: self.user_type,
            profile: self.profile.clone(),
            created_at: self.created_at,
        }
    }

    /// Two-letter billing country, if the user gave one.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.profile.country.as_deref()
    }

    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.profile.first_name, &self.profile.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.to_string(),
        }
    }
}

/// Everything needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub user_type: UserType,
    pub profile: ProfileFields,
}

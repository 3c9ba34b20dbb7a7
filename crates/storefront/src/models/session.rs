//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use signcraft_core::{Email, UserId, UserType};

/// Identity carried by a verified bearer token.
///
/// Minimal data needed to authorize a request without a database lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Account kind at the time the token was issued.
    pub user_type: UserType,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.user_type.is_admin()
    }

    /// Whether this caller may see a resource owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin() || self.id == owner
    }
}

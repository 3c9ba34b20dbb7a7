//! Status enums for users and orders.

use serde::{Deserialize, Serialize};

/// Kind of customer account.
///
/// Drives VAT treatment and access to admin endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Private customer, always charged VAT.
    #[default]
    Consumer,
    /// Company customer, may be reverse-charged across borders.
    Business,
    /// Shop staff with access to template, pricing and order management.
    Admin,
}

impl UserType {
    /// Whether this account may use admin endpoints.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumer => write!(f, "consumer"),
            Self::Business => write!(f, "business"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "consumer" => Ok(Self::Consumer),
            "business" => Ok(Self::Business),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user type: {s}")),
        }
    }
}

/// Production status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Orders only move forward; cancelling is possible until shipment.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::InProduction | Self::Cancelled)
                | (Self::InProduction, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Human readable label for documents.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProduction => "In production",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_from_str_is_case_insensitive() {
        assert_eq!("Business".parse::<UserType>(), Ok(UserType::Business));
        assert!("robot".parse::<UserType>().is_err());
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::InProduction));
        assert!(OrderStatus::InProduction.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::New));
    }

    #[test]
    fn test_order_status_serde() {
        let json = serde_json::to_string(&OrderStatus::InProduction).unwrap_or_default();
        assert_eq!(json, "\"in_production\"");
    }
}

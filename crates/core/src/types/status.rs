//! Status enums for orders, payments and users.
//!
//! All of these are stored as plain text columns. Parsing is
//! case-insensitive so that admin forms and legacy rows with mixed casing
//! are accepted; `Display` always produces the canonical spelling.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not in the allow-list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct InvalidStatus {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl InvalidStatus {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Every status an order may hold.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Completed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Customers may only cancel orders that have not started processing.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Payment can only be (re)started while the order is pending.
    #[must_use]
    pub const fn accepts_payment(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| InvalidStatus::new("order status", s))
    }
}

/// Payment record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(Self::Unpaid),
            "pending" => Ok(Self::Pending),
            "completed" | "paid" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(InvalidStatus::new("payment status", s)),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[serde(rename = "COD")]
    Cod,
    /// Hosted PayOS payment link.
    #[serde(rename = "PayOS")]
    PayOs,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::PayOs => "PayOS",
        }
    }

    /// Human-readable label for order pages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on delivery",
            Self::PayOs => "PayOS (bank transfer / QR)",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::Cod),
            "payos" => Ok(Self::PayOs),
            _ => Err(InvalidStatus::new("payment method", s)),
        }
    }
}

/// User role. The numeric ids match the seeded `user_role` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    Admin,
    #[default]
    Customer,
}

impl Role {
    pub const ADMIN_ID: i32 = 1;
    pub const CUSTOMER_ID: i32 = 2;

    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::Admin => Self::ADMIN_ID,
            Self::Customer => Self::CUSTOMER_ID,
        }
    }

    /// Map a `user_role.id` to a role. Unknown ids are treated as customers.
    #[must_use]
    pub const fn from_id(id: i32) -> Self {
        if id == Self::ADMIN_ID {
            Self::Admin
        } else {
            Self::Customer
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Customer => "Customer",
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn order_status_parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(" PENDING ".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!(
            "cancelled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn order_status_rejects_unknown_values() {
        let err = "refunded".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.value, "refunded");
        assert_eq!(err.to_string(), "invalid order status: refunded");
    }

    #[test]
    fn only_pending_orders_are_cancellable() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_cancellable(), status == OrderStatus::Pending);
        }
    }

    #[test]
    fn order_status_display_matches_storage_form() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn payment_method_parses_form_values() {
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert_eq!("payos".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayOs);
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn payment_status_accepts_aliases() {
        assert_eq!(
            "Paid".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Completed
        );
        assert_eq!(
            "canceled".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Cancelled
        );
    }

    #[test]
    fn role_ids_round_trip() {
        assert_eq!(Role::from_id(1), Role::Admin);
        assert_eq!(Role::from_id(2), Role::Customer);
        assert_eq!(Role::from_id(99), Role::Customer);
        assert_eq!(Role::Admin.id(), 1);
        assert!(Role::Admin.is_admin());
    }
}

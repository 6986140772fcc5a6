//! Order and OrderItem Models

use super::product::Discount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// ```text
/// pending ─┬─> paid ─> shipped ─> delivery_in_progress ─> delivered ─> completed
///          │     └──> returned
///          ├─> abandoned        (expired or payment failed)
///          └─> inventory_issue
/// ```
///
/// `pending -> paid | abandoned | inventory_issue` belongs to payment
/// settlement. Everything after `paid` is operator-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    DeliveryInProgress,
    Delivered,
    Completed,
    Abandoned,
    InventoryIssue,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::DeliveryInProgress => "delivery_in_progress",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::InventoryIssue => "inventory_issue",
            Self::Returned => "returned",
        }
    }

    /// Position on the logistics path, `None` off the path
    fn logistics_rank(&self) -> Option<u8> {
        match self {
            Self::Paid => Some(0),
            Self::Shipped => Some(1),
            Self::DeliveryInProgress => Some(2),
            Self::Delivered => Some(3),
            Self::Completed => Some(4),
            _ => None,
        }
    }

    /// No transition leaves this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Abandoned | Self::InventoryIssue | Self::Returned
        )
    }

    /// Statuses only payment settlement may set
    pub fn is_payment_owned(&self) -> bool {
        matches!(self, Self::Paid | Self::Abandoned | Self::InventoryIssue)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Paid | Self::Abandoned | Self::InventoryIssue) => true,
            (Self::Paid, Self::Returned) => true,
            (from, to) => match (from.logistics_rank(), to.logistics_rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub email: String,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    /// Sum of item subtotals, computed server-side
    pub total: Decimal,
    pub status: OrderStatus,
    pub transaction_id: String,
    pub reserved_at: i64,
    pub expires_at: i64,
    pub updated_at: i64,
}

/// Order line, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Catalog price at reservation time
    pub base_price: Decimal,
    /// Effective unit price at reservation time
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

impl OrderItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

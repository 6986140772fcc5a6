//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount rule kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the base price (10 = 10%)
    Percentage,
    /// `value` is subtracted from the base price
    Fixed,
}

/// Optional discount attached to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: DiscountType,
    pub value: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Discount {
    pub fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountType::Percentage,
            value,
            active: true,
        }
    }

    pub fn fixed(value: Decimal) -> Self {
        Self {
            kind: DiscountType::Fixed,
            value,
            active: true,
        }
    }
}

/// Product entity
///
/// The reservation core writes `stock` only; price and discount belong to
/// the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Unit price in major currency units
    pub price: Decimal,
    /// Units on hand, never negative
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

/// Product as shown by the storefront (catalog read path)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub effective_price: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let effective_price = crate::pricing::effective_price(&product);
        Self {
            product,
            effective_price,
        }
    }
}

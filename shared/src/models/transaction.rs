//! Payment Transaction Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Transaction status, `pending` moves to a terminal status exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Payment gateway that processes a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Paystack,
    Flutterwave,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
        }
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(Self::Paystack),
            "flutterwave" => Ok(Self::Flutterwave),
            other => Err(format!("unknown payment gateway: {other}")),
        }
    }
}

/// Payment transaction
///
/// `id` doubles as the gateway reference and the settlement idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub gateway: GatewayKind,
    /// Last payload received from the gateway (webhook body, verify response
    /// or initialization error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_parse() {
        assert_eq!("paystack".parse::<GatewayKind>(), Ok(GatewayKind::Paystack));
        assert_eq!(
            " Flutterwave ".parse::<GatewayKind>(),
            Ok(GatewayKind::Flutterwave)
        );
        assert!("stripe".parse::<GatewayKind>().is_err());
    }

    #[test]
    fn test_terminal_status() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_gateway_serde() {
        let json = serde_json::to_string(&GatewayKind::Flutterwave).unwrap();
        assert_eq!(json, "\"flutterwave\"");
    }
}

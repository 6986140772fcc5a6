//! Verify Fallback
//!
//! Called by the storefront when the buyer returns from the gateway, in
//! case the webhook is late or lost. Any write goes through the same
//! settlement handler the webhooks use.

use shared::checkout::{VerifyResponse, VerifyStatus};
use shared::models::TransactionStatus;
use shared::{AppError, AppResult, ErrorCode};

use crate::gateway::GatewayRegistry;
use crate::settlement::{SettleOutcome, SettlementHandler};
use crate::store::ShopStorage;
use crate::utils::blocking;

#[derive(Clone)]
pub struct VerifyService {
    storage: ShopStorage,
    settlement: SettlementHandler,
    gateways: GatewayRegistry,
    /// Settle on gateway-reported success instead of waiting for the webhook
    settle_success: bool,
}

impl VerifyService {
    pub fn new(
        storage: ShopStorage,
        settlement: SettlementHandler,
        gateways: GatewayRegistry,
        settle_success: bool,
    ) -> Self {
        Self {
            storage,
            settlement,
            gateways,
            settle_success,
        }
    }

    pub async fn verify(&self, reference: &str) -> AppResult<VerifyResponse> {
        let reference = reference.trim().to_string();
        if reference.is_empty() {
            return Err(AppError::validation("reference is required").with_detail("fields", vec!["reference"]));
        }

        let storage = self.storage.clone();
        let lookup = reference.clone();
        let transaction = blocking(move || storage.get_transaction(&lookup))
            .await??
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::TransactionNotFound,
                    format!("Transaction {reference} not found"),
                )
            })?;

        // Already settled locally; no need to ask the gateway
        match transaction.status {
            TransactionStatus::Success => return Ok(response(VerifyStatus::Success, None)),
            TransactionStatus::Failed => return Ok(response(VerifyStatus::Failed, None)),
            TransactionStatus::Pending => {}
        }

        let gateway = self.gateways.get(transaction.gateway)?;
        let outcome = gateway.verify(&reference).await.map_err(|e| {
            tracing::warn!(reference = %reference, error = %e, "Gateway verify failed");
            AppError::from(e)
        })?;

        let settle = match outcome.status {
            VerifyStatus::Success => self.settle_success.then_some(true),
            VerifyStatus::Failed => Some(false),
            VerifyStatus::Pending => None,
        };

        if let Some(success) = settle {
            let settlement = self.settlement.clone();
            let settle_ref = reference.clone();
            let raw = outcome.raw.clone();
            let settled = blocking(move || settlement.settle(&settle_ref, success, Some(raw))).await??;

            if let SettleOutcome::AlreadySettled(TransactionStatus::Failed) = settled
                && success
            {
                // Paid at the gateway after the reservation was released
                tracing::error!(
                    reference = %reference,
                    "Gateway reports success for a released reservation; manual reconciliation needed"
                );
            }
        }

        tracing::info!(
            reference = %reference,
            gateway = %transaction.gateway,
            status = ?outcome.status,
            "Payment verified"
        );

        Ok(response(outcome.status, outcome.message))
    }
}

fn response(status: VerifyStatus, message: Option<String>) -> VerifyResponse {
    VerifyResponse { status, message }
}

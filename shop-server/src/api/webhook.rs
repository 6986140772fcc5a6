//! Gateway webhooks
//!
//! POST /webhooks/paystack, POST /webhooks/flutterwave
//!
//! Raw body is kept for signature verification. A bad signature is 401
//! and settles nothing. A settle that could not be written is 500 so the
//! gateway redelivers; every other outcome (including duplicates and
//! unknown references) is 200.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Router, routing::post};
use shared::AppResult;
use shared::models::GatewayKind;

use crate::core::ServerState;
use crate::gateway::WebhookEvent;
use crate::security_log;
use crate::settlement::SettleOutcome;
use crate::store::StorageResult;
use crate::utils::blocking;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/webhooks/paystack", post(paystack))
        .route("/webhooks/flutterwave", post(flutterwave))
}

pub async fn paystack(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    handle(&state, GatewayKind::Paystack, &headers, &body).await
}

pub async fn flutterwave(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    handle(&state, GatewayKind::Flutterwave, &headers, &body).await
}

async fn handle(state: &ServerState, kind: GatewayKind, headers: &HeaderMap, body: &Bytes) -> StatusCode {
    let gateway = match state.gateways.get(kind) {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!(gateway = %kind, error = %e, "Webhook for unconfigured gateway");
            return StatusCode::NOT_FOUND;
        }
    };

    // 1. Authenticate
    if let Err(e) = gateway.verify_signature(headers, body) {
        security_log!(
            WARN,
            "webhook_signature_rejected",
            gateway = kind.as_str(),
            error = e.to_string()
        );
        return StatusCode::UNAUTHORIZED;
    }

    // 2. Extract reference and outcome
    let event = match gateway.parse_webhook(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(gateway = %kind, error = %e, "Failed to parse webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let (reference, success, payload) = match event {
        WebhookEvent::Settle {
            reference,
            success,
            payload,
        } => (reference, success, payload),
        WebhookEvent::Ignored { event } => {
            tracing::info!(gateway = %kind, event = %event, "Webhook acknowledged without settlement");
            return StatusCode::OK;
        }
    };

    tracing::info!(gateway = %kind, reference = %reference, success, "Webhook received");

    // 3. Settle (idempotent)
    let settlement = state.settlement.clone();
    let settle_ref = reference.clone();
    let result = blocking(move || settlement.settle(&settle_ref, success, Some(payload))).await;

    settle_response(kind, &reference, result)
}

/// Nothing was committed on an error arm, so ask for redelivery
fn settle_response(
    kind: GatewayKind,
    reference: &str,
    result: AppResult<StorageResult<SettleOutcome>>,
) -> StatusCode {
    match result {
        Ok(Ok(SettleOutcome::Settled { order_id, status, .. })) => {
            tracing::info!(gateway = %kind, reference = %reference, order_id = %order_id, status = ?status, "Webhook settled transaction");
            StatusCode::OK
        }
        Ok(Ok(SettleOutcome::AlreadySettled(status))) => {
            tracing::info!(gateway = %kind, reference = %reference, status = ?status, "Duplicate webhook ignored");
            StatusCode::OK
        }
        Ok(Ok(SettleOutcome::UnknownReference)) => {
            tracing::warn!(gateway = %kind, reference = %reference, "Webhook for unknown reference");
            StatusCode::OK
        }
        Ok(Err(e)) => {
            tracing::error!(gateway = %kind, reference = %reference, error = %e, "Webhook settlement failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::error!(gateway = %kind, reference = %reference, error = %e, "Webhook settlement failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::gateway::{GatewayRegistry, PaystackGateway};
    use crate::store::{ShopStorage, StorageError};
    use hmac::{Hmac, Mac};
    use sha2::Sha512;
    use shared::AppError;
    use shared::models::TransactionStatus;
    use std::sync::Arc;
    use std::time::Duration;

    const SECRET: &str = "sk_test_webhook";

    fn state() -> ServerState {
        let storage = ShopStorage::open_in_memory().unwrap();
        let gateways = GatewayRegistry::new(GatewayKind::Paystack).with(Arc::new(
            PaystackGateway::new("http://127.0.0.1:9", SECRET, Duration::from_secs(1)).unwrap(),
        ));
        ServerState::build(Config::default(), storage, gateways)
    }

    fn signed(body: &[u8]) -> HeaderMap {
        let mut mac = Hmac::<Sha512>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-paystack-signature",
            hex::encode(mac.finalize().into_bytes()).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_settle_response_codes() {
        let kind = GatewayKind::Paystack;
        let settled = SettleOutcome::Settled {
            order_id: "o-1".into(),
            status: TransactionStatus::Success,
            restored_lines: 0,
        };
        assert_eq!(settle_response(kind, "tx", Ok(Ok(settled))), StatusCode::OK);
        assert_eq!(
            settle_response(
                kind,
                "tx",
                Ok(Ok(SettleOutcome::AlreadySettled(TransactionStatus::Failed)))
            ),
            StatusCode::OK
        );
        assert_eq!(
            settle_response(kind, "tx", Ok(Ok(SettleOutcome::UnknownReference))),
            StatusCode::OK
        );

        let broken = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            settle_response(kind, "tx", Ok(Err(StorageError::from(broken)))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            settle_response(kind, "tx", Err(AppError::internal("task panicked"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unreadable_transaction_asks_for_redelivery() {
        let state = state();
        state
            .storage
            .put_raw_transaction("tx-broken", b"{not json")
            .unwrap();

        let body = Bytes::from_static(
            br#"{"event":"charge.success","data":{"reference":"tx-broken"}}"#,
        );
        let status = handle(&state, GatewayKind::Paystack, &signed(&body), &body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_acknowledged() {
        let state = state();
        let body = Bytes::from_static(
            br#"{"event":"charge.success","data":{"reference":"tx-missing"}}"#,
        );
        let status = handle(&state, GatewayKind::Paystack, &signed(&body), &body).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_is_not_found() {
        let state = state();
        let body = Bytes::from_static(b"{}");
        let status = handle(&state, GatewayKind::Flutterwave, &HeaderMap::new(), &body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

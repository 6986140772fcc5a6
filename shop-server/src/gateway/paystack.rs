//! Paystack integration via REST API (no SDK dependency)
//!
//! - initialize: `POST /transaction/initialize`, amount in kobo
//! - verify: `GET /transaction/verify/{reference}`
//! - webhook: HMAC-SHA512 of the raw body, hex in `x-paystack-signature`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use serde_json::{Value, json};
use sha2::Sha512;
use shared::checkout::VerifyStatus;
use shared::models::GatewayKind;
use shared::pricing::to_minor_units;
use std::time::Duration;

use super::{
    GatewayError, InitializeRequest, PaymentGateway, VerifyOutcome, WebhookEvent, build_client,
    join_url, read_json, signature_header,
};

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

const KIND: GatewayKind = GatewayKind::Paystack;

pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            secret_key: secret_key.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn kind(&self) -> GatewayKind {
        KIND
    }

    async fn initialize(&self, request: &InitializeRequest) -> Result<String, GatewayError> {
        let body = initialize_body(request)?;
        let resp = self
            .client
            .post(join_url(&self.base_url, "/transaction/initialize"))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::http(KIND, e))?;
        let resp = read_json(KIND, resp).await?;

        if resp["status"].as_bool() != Some(true) {
            return Err(GatewayError::Rejected {
                gateway: KIND,
                message: resp["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        resp["data"]["authorization_url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GatewayError::malformed(KIND, "missing data.authorization_url"))
    }

    async fn verify(&self, reference: &str) -> Result<VerifyOutcome, GatewayError> {
        let resp = self
            .client
            .get(join_url(
                &self.base_url,
                &format!("/transaction/verify/{reference}"),
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::http(KIND, e))?;
        let resp = read_json(KIND, resp).await?;

        if resp["status"].as_bool() != Some(true) {
            return Err(GatewayError::Rejected {
                gateway: KIND,
                message: resp["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        let data = &resp["data"];
        let status = data["status"]
            .as_str()
            .ok_or_else(|| GatewayError::malformed(KIND, "missing data.status"))?;

        Ok(VerifyOutcome {
            status: verify_status(status),
            message: data["gateway_response"].as_str().map(String::from),
            raw: data.clone(),
        })
    }

    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), GatewayError> {
        let signature = signature_header(headers, SIGNATURE_HEADER)?;
        verify_body_signature(&self.secret_key, body, signature)
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        parse_event(body)
    }
}

/// JSON body for `/transaction/initialize`
pub fn initialize_body(request: &InitializeRequest) -> Result<Value, GatewayError> {
    let amount =
        to_minor_units(request.amount).ok_or(GatewayError::InvalidAmount(request.amount))?;
    Ok(json!({
        "email": request.email,
        "amount": amount,
        "currency": request.currency,
        "reference": request.reference,
        "callback_url": request.redirect_url,
        "metadata": {
            "customer_name": request.customer_name,
            "phone": request.phone,
        },
    }))
}

/// Map a Paystack transaction status onto the verify outcome
pub fn verify_status(status: &str) -> VerifyStatus {
    match status {
        "success" => VerifyStatus::Success,
        "ongoing" | "pending" | "processing" | "queued" => VerifyStatus::Pending,
        _ => VerifyStatus::Failed,
    }
}

fn verify_body_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), GatewayError> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::InvalidSignature)?;
    mac.update(body);

    let sig_bytes = hex::decode(signature).map_err(|_| GatewayError::InvalidSignature)?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| GatewayError::InvalidSignature)
}

/// `charge.success` settles success, `charge.failed` settles failure,
/// anything else is acknowledged without touching the transaction
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let event: Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

    let event_type = event["event"].as_str().unwrap_or("");
    let success = match event_type {
        "charge.success" => true,
        "charge.failed" => false,
        other => {
            return Ok(WebhookEvent::Ignored {
                event: other.to_string(),
            });
        }
    };

    let reference = event["data"]["reference"]
        .as_str()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| GatewayError::InvalidPayload("missing data.reference".into()))?;

    Ok(WebhookEvent::Settle {
        reference: reference.to_string(),
        success,
        payload: event["data"].clone(),
    })
}

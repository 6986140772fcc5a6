//! Flutterwave integration via REST API (no SDK dependency)
//!
//! - initialize: `POST /v3/payments`, amount in major units
//! - verify: `GET /v3/transactions/verify_by_reference?tx_ref=...`
//! - webhook: shared secret hash echoed in `verif-hash`

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{Value, json};
use shared::checkout::VerifyStatus;
use shared::models::GatewayKind;
use std::time::Duration;

use super::{
    GatewayError, InitializeRequest, PaymentGateway, VerifyOutcome, WebhookEvent, build_client,
    decimal_field, join_url, read_json, signature_header,
};
use crate::utils::secrets_match;

pub const DEFAULT_BASE_URL: &str = "https://api.flutterwave.com";
pub const SIGNATURE_HEADER: &str = "verif-hash";

const KIND: GatewayKind = GatewayKind::Flutterwave;

pub struct FlutterwaveGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
    secret_hash: String,
    /// Shown on the hosted payment page
    title: String,
    logo_url: Option<String>,
}

impl FlutterwaveGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        secret_hash: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            secret_hash: secret_hash.into(),
            title: "Checkout".to_string(),
            logo_url: None,
        })
    }

    pub fn with_branding(mut self, title: impl Into<String>, logo_url: Option<String>) -> Self {
        self.title = title.into();
        self.logo_url = logo_url;
        self
    }

    /// JSON body for `/v3/payments`
    pub fn initialize_body(&self, request: &InitializeRequest) -> Value {
        json!({
            "tx_ref": request.reference,
            "amount": request.amount,
            "currency": request.currency,
            "redirect_url": request.redirect_url,
            "customer": {
                "email": request.email,
                "phonenumber": request.phone,
                "name": request.customer_name,
            },
            "customizations": {
                "title": self.title,
                "logo": self.logo_url,
            },
        })
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn kind(&self) -> GatewayKind {
        KIND
    }

    async fn initialize(&self, request: &InitializeRequest) -> Result<String, GatewayError> {
        let resp = self
            .client
            .post(join_url(&self.base_url, "/v3/payments"))
            .bearer_auth(&self.secret_key)
            .json(&self.initialize_body(request))
            .send()
            .await
            .map_err(|e| GatewayError::http(KIND, e))?;
        let resp = read_json(KIND, resp).await?;

        if resp["status"].as_str() != Some("success") {
            return Err(GatewayError::Rejected {
                gateway: KIND,
                message: resp["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        resp["data"]["link"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GatewayError::malformed(KIND, "missing data.link"))
    }

    async fn verify(&self, reference: &str) -> Result<VerifyOutcome, GatewayError> {
        let resp = self
            .client
            .get(join_url(
                &self.base_url,
                "/v3/transactions/verify_by_reference",
            ))
            .query(&[("tx_ref", reference)])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::http(KIND, e))?;
        let resp = read_json(KIND, resp).await?;

        if resp["status"].as_str() != Some("success") {
            return Err(GatewayError::Rejected {
                gateway: KIND,
                message: resp["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        let data = &resp["data"];
        let status = data["status"]
            .as_str()
            .ok_or_else(|| GatewayError::malformed(KIND, "missing data.status"))?;

        let status = match status {
            "successful" if fully_charged(data) => VerifyStatus::Success,
            "pending" => VerifyStatus::Pending,
            _ => VerifyStatus::Failed,
        };

        Ok(VerifyOutcome {
            status,
            message: data["processor_response"].as_str().map(String::from),
            raw: data.clone(),
        })
    }

    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), GatewayError> {
        let provided = signature_header(headers, SIGNATURE_HEADER)?;
        if self.secret_hash.is_empty() {
            return Err(GatewayError::InvalidSignature);
        }
        if secrets_match(&self.secret_hash, provided) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature)
        }
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        parse_event(body)
    }
}

/// `charged_amount >= amount`; missing amounts count as not charged
fn fully_charged(data: &Value) -> bool {
    match (
        decimal_field(&data["charged_amount"]),
        decimal_field(&data["amount"]),
    ) {
        (Some(charged), Some(amount)) => charged >= amount,
        _ => false,
    }
}

/// Fields may arrive at the top level (legacy payloads) or under `data`
fn field<'a>(event: &'a Value, top: &str, nested: &str) -> &'a Value {
    match &event[top] {
        Value::Null => &event["data"][nested],
        v => v,
    }
}

/// A `successful` charge settles success only when fully charged;
/// `pending` is acknowledged and left for later; any other terminal
/// status settles failure.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let event: Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

    if let Some(kind) = event["event"].as_str()
        && kind != "charge.completed"
    {
        return Ok(WebhookEvent::Ignored {
            event: kind.to_string(),
        });
    }

    let reference = field(&event, "txRef", "tx_ref")
        .as_str()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| GatewayError::InvalidPayload("missing tx_ref".into()))?;

    let status = field(&event, "status", "status").as_str().unwrap_or("");
    let charged = decimal_field(field(&event, "charged_amount", "charged_amount"));
    let amount = decimal_field(field(&event, "amount", "amount"));

    let success = match status {
        "successful" => matches!((charged, amount), (Some(c), Some(a)) if c >= a),
        "pending" | "" => {
            return Ok(WebhookEvent::Ignored {
                event: format!("status:{status}"),
            });
        }
        _ => false,
    };

    Ok(WebhookEvent::Settle {
        reference: reference.to_string(),
        success,
        payload: event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn gateway() -> FlutterwaveGateway {
        FlutterwaveGateway::new(DEFAULT_BASE_URL, "FLWSECK_TEST", "hash-123", Duration::from_secs(1))
            .unwrap()
            .with_branding("Demo Store", Some("https://shop.example/logo.png".into()))
    }

    #[test]
    fn test_initialize_body_uses_major_units() {
        let request = InitializeRequest {
            reference: "tx-1".into(),
            amount: Decimal::new(180050, 2),
            currency: "NGN".into(),
            email: "ada@example.com".into(),
            customer_name: "Ada".into(),
            phone: "0801".into(),
            redirect_url: "https://shop.example/success".into(),
        };
        let body = gateway().initialize_body(&request);
        assert_eq!(body["tx_ref"], "tx-1");
        assert_eq!(body["amount"], 1800.5);
        assert_eq!(body["customer"]["phonenumber"], "0801");
        assert_eq!(body["customizations"]["title"], "Demo Store");
    }

    #[test]
    fn test_verif_hash() {
        let gateway = gateway();
        let mut headers = HeaderMap::new();
        assert!(matches!(
            gateway.verify_signature(&headers, b"{}"),
            Err(GatewayError::MissingSignature(SIGNATURE_HEADER))
        ));

        headers.insert(SIGNATURE_HEADER, "wrong".parse().unwrap());
        assert!(matches!(
            gateway.verify_signature(&headers, b"{}"),
            Err(GatewayError::InvalidSignature)
        ));

        headers.insert(SIGNATURE_HEADER, "hash-123".parse().unwrap());
        assert!(gateway.verify_signature(&headers, b"{}").is_ok());
    }

    #[test]
    fn test_empty_secret_hash_rejects_everything() {
        let gateway =
            FlutterwaveGateway::new(DEFAULT_BASE_URL, "k", "", Duration::from_secs(1)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, "anything".parse().unwrap());
        assert!(gateway.verify_signature(&headers, b"{}").is_err());
    }

    #[test]
    fn test_parse_successful_nested() {
        let body = br#"{"event":"charge.completed","data":{"tx_ref":"tx-1","status":"successful","amount":1800,"charged_amount":1800}}"#;
        match parse_event(body).unwrap() {
            WebhookEvent::Settle {
                reference,
                success,
                payload,
            } => {
                assert_eq!(reference, "tx-1");
                assert!(success);
                assert_eq!(payload["event"], "charge.completed");
            }
            other => panic!("expected settle, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_top_level_fields() {
        let body = br#"{"txRef":"tx-2","status":"successful","amount":"500","charged_amount":"500"}"#;
        assert!(matches!(
            parse_event(body).unwrap(),
            WebhookEvent::Settle { success: true, ref reference, .. } if reference == "tx-2"
        ));
    }

    #[test]
    fn test_parse_undercharged_is_failure() {
        let body = br#"{"event":"charge.completed","data":{"tx_ref":"tx-1","status":"successful","amount":1800,"charged_amount":1000}}"#;
        assert!(matches!(
            parse_event(body).unwrap(),
            WebhookEvent::Settle { success: false, .. }
        ));
    }

    #[test]
    fn test_parse_failed_and_pending() {
        let failed = br#"{"event":"charge.completed","data":{"tx_ref":"tx-1","status":"failed","amount":1800}}"#;
        assert!(matches!(
            parse_event(failed).unwrap(),
            WebhookEvent::Settle { success: false, .. }
        ));

        let pending = br#"{"event":"charge.completed","data":{"tx_ref":"tx-1","status":"pending"}}"#;
        assert!(matches!(
            parse_event(pending).unwrap(),
            WebhookEvent::Ignored { .. }
        ));
    }

    #[test]
    fn test_parse_other_event_ignored() {
        let body = br#"{"event":"transfer.completed","data":{"reference":"x"}}"#;
        assert_eq!(
            parse_event(body).unwrap(),
            WebhookEvent::Ignored {
                event: "transfer.completed".into()
            }
        );
    }

    #[test]
    fn test_parse_missing_reference() {
        let body = br#"{"event":"charge.completed","data":{"status":"successful"}}"#;
        assert!(matches!(
            parse_event(body),
            Err(GatewayError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_fully_charged() {
        assert!(fully_charged(&json!({"amount": 100, "charged_amount": 101.5})));
        assert!(!fully_charged(&json!({"amount": 100, "charged_amount": 99})));
        assert!(!fully_charged(&json!({"amount": 100})));
    }
}

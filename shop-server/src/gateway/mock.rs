//! In-process gateway for service tests

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::json;
use shared::checkout::VerifyStatus;
use shared::models::GatewayKind;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{GatewayError, InitializeRequest, PaymentGateway, VerifyOutcome, WebhookEvent};

pub enum InitBehavior {
    Url(String),
    Reject,
    Hang,
}

pub struct MockGateway {
    kind: GatewayKind,
    init: InitBehavior,
    verify_status: Mutex<Option<VerifyStatus>>,
    pub verify_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(kind: GatewayKind, init: InitBehavior) -> Self {
        Self {
            kind,
            init,
            verify_status: Mutex::new(None),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// `None` makes verify fail with an upstream error
    pub fn set_verify(&self, status: Option<VerifyStatus>) {
        *self.verify_status.lock().unwrap() = status;
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    async fn initialize(&self, request: &InitializeRequest) -> Result<String, GatewayError> {
        match &self.init {
            InitBehavior::Url(base) => Ok(format!("{base}/{}", request.reference)),
            InitBehavior::Reject => Err(GatewayError::Rejected {
                gateway: self.kind,
                message: "Invalid key".into(),
            }),
            InitBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GatewayError::Timeout(self.kind))
            }
        }
    }

    async fn verify(&self, reference: &str) -> Result<VerifyOutcome, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let status = *self.verify_status.lock().unwrap();
        match status {
            Some(status) => Ok(VerifyOutcome {
                status,
                message: None,
                raw: json!({"reference": reference, "mock": true}),
            }),
            None => Err(GatewayError::Status {
                gateway: self.kind,
                status: 500,
                body: "upstream down".into(),
            }),
        }
    }

    fn verify_signature(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<(), GatewayError> {
        Ok(())
    }

    fn parse_webhook(&self, _body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        Err(GatewayError::InvalidPayload("mock".into()))
    }
}

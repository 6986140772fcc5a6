//! Shared fixtures: temp store, stub gateway server, request helpers

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sha2::Sha512;
use shared::models::{Discount, GatewayKind, Product};
use shop_server::gateway::{FlutterwaveGateway, GatewayRegistry, PaystackGateway};
use shop_server::store::ShopStorage;
use shop_server::{Config, ServerState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const PAYSTACK_SECRET: &str = "sk_test_shop";
pub const FLUTTERWAVE_SECRET: &str = "FLWSECK_TEST-shop";
pub const FLUTTERWAVE_HASH: &str = "verif-hash-shop";
pub const OPERATOR_TOKEN: &str = "operator-token";

/// Records what the gateways were asked and controls their answers
#[derive(Clone)]
pub struct StubGateway {
    pub requests: Arc<Mutex<Vec<(String, Value)>>>,
    pub verify_status: Arc<Mutex<String>>,
    pub fail_initialize: Arc<AtomicBool>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self {
            requests: Arc::default(),
            verify_status: Arc::new(Mutex::new("pending".into())),
            fail_initialize: Arc::default(),
        }
    }
}

impl StubGateway {
    pub fn set_verify_status(&self, status: &str) {
        *self.verify_status.lock().unwrap() = status.to_string();
    }

    pub fn fail_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    /// Last initialize body received on `path`
    pub fn last_request(&self, path: &str) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
    }

    fn record(&self, path: &str, body: Value) {
        self.requests.lock().unwrap().push((path.to_string(), body));
    }
}

async fn paystack_initialize(
    State(stub): State<StubGateway>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.record("/transaction/initialize", body.clone());
    if stub.fail_initialize.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": false, "message": "upstream exploded"})),
        );
    }
    let reference = body["reference"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": format!("https://checkout.paystack.test/{reference}"),
                "access_code": "code",
                "reference": reference,
            }
        })),
    )
}

async fn paystack_verify(
    State(stub): State<StubGateway>,
    Path(reference): Path<String>,
) -> Json<Value> {
    let status = stub.verify_status.lock().unwrap().clone();
    Json(json!({
        "status": true,
        "message": "Verification successful",
        "data": {
            "reference": reference,
            "status": status,
            "gateway_response": "Approved",
        }
    }))
}

async fn flutterwave_initialize(
    State(stub): State<StubGateway>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.record("/v3/payments", body.clone());
    if stub.fail_initialize.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "Invalid currency"})),
        );
    }
    let reference = body["tx_ref"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Hosted Link",
            "data": {"link": format!("https://checkout.flutterwave.test/{reference}")}
        })),
    )
}

async fn flutterwave_verify(
    State(stub): State<StubGateway>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let status = stub.verify_status.lock().unwrap().clone();
    Json(json!({
        "status": "success",
        "message": "Transaction fetched successfully",
        "data": {
            "tx_ref": query.get("tx_ref"),
            "status": status,
            "amount": 1800,
            "charged_amount": 1800,
            "processor_response": "Approved by Financial Institution",
        }
    }))
}

/// Serve both gateway APIs on an ephemeral local port
pub async fn spawn_stub(stub: StubGateway) -> String {
    let app = Router::new()
        .route("/transaction/initialize", post(paystack_initialize))
        .route("/transaction/verify/{reference}", get(paystack_verify))
        .route("/v3/payments", post(flutterwave_initialize))
        .route(
            "/v3/transactions/verify_by_reference",
            get(flutterwave_verify),
        )
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct TestApp {
    pub _dir: tempfile::TempDir,
    pub state: ServerState,
    pub router: Router,
    pub stub: StubGateway,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let stub = StubGateway::default();
        let base_url = spawn_stub(stub.clone()).await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: dir.path().to_path_buf(),
            public_base_url: "https://shop.example".into(),
            paystack_secret_key: PAYSTACK_SECRET.into(),
            paystack_base_url: base_url.clone(),
            flutterwave_secret_key: FLUTTERWAVE_SECRET.into(),
            flutterwave_secret_hash: FLUTTERWAVE_HASH.into(),
            flutterwave_base_url: base_url.clone(),
            operator_token: OPERATOR_TOKEN.into(),
            gateway_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        customize(&mut config);

        let storage = ShopStorage::open(config.database_path()).unwrap();
        let gateways = GatewayRegistry::new(config.default_gateway)
            .with(Arc::new(
                PaystackGateway::new(
                    config.paystack_base_url.clone(),
                    config.paystack_secret_key.clone(),
                    config.gateway_timeout,
                )
                .unwrap(),
            ))
            .with(Arc::new(
                FlutterwaveGateway::new(
                    config.flutterwave_base_url.clone(),
                    config.flutterwave_secret_key.clone(),
                    config.flutterwave_secret_hash.clone(),
                    config.gateway_timeout,
                )
                .unwrap(),
            ));

        let state = ServerState::build(config, storage, gateways);
        let router = shop_server::api::build_app(state.clone());
        Self {
            _dir: dir,
            state,
            router,
            stub,
        }
    }

    /// Lamp: 1000 with 10% off, stock given
    pub fn seed_lamp(&self, stock: i64) {
        self.state
            .storage
            .upsert_product(&Product {
                id: "lamp".into(),
                name: "Desk Lamp".into(),
                price: Decimal::from(1000),
                stock,
                discount: Some(Discount::percentage(Decimal::from(10))),
            })
            .unwrap();
    }

    pub fn stock(&self, product_id: &str) -> i64 {
        self.state
            .storage
            .get_product(product_id)
            .unwrap()
            .unwrap()
            .stock
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn checkout(&self, quantity: i64, gateway: GatewayKind) -> (StatusCode, Value) {
        self.send(json_request(
            "POST",
            "/api/checkout",
            &checkout_body(quantity, gateway),
        ))
        .await
    }
}

pub fn checkout_body(quantity: i64, gateway: GatewayKind) -> Value {
    json!({
        "email": "ada@example.com",
        "customer_name": "Ada Lovelace",
        "phone": "08012345678",
        "address": "12 Marina, Lagos",
        "items": [{"product_id": "lamp", "quantity": quantity}],
        "gateway": gateway,
    })
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn paystack_signature(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(PAYSTACK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn webhook_request(uri: &str, header: (&str, &str), body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(header.0, header.1)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

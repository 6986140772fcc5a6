//! HTTP client for the shop server API

use crate::{ClientConfig, ClientError, ClientResult};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::checkout::{CheckoutRequest, CheckoutResponse, VerifyRequest, VerifyResponse};
use shared::models::ProductView;
use shared::{ApiResponse, ErrorCode};

/// Failure body characters kept when the server sends no structured error
const MAX_ERROR_TEXT: usize = 256;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Success bodies are the payload itself; failures are `ApiResponse`
    /// envelopes carrying `details.reason`
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(match serde_json::from_str::<ApiResponse<Value>>(&text) {
                Ok(body) => ClientError::Api {
                    code: body.code.and_then(|c| ErrorCode::try_from(c).ok()),
                    reason: body.reason().unwrap_or("internal").to_string(),
                    message: body.message,
                },
                Err(_) => ClientError::Api {
                    code: None,
                    reason: fallback_reason(status).to_string(),
                    message: text.chars().take(MAX_ERROR_TEXT).collect(),
                },
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    // ========== Storefront API ==========

    /// Product with its effective price
    pub async fn product(&self, product_id: &str) -> ClientResult<ProductView> {
        self.get(&format!("/api/products/{product_id}")).await
    }

    /// Reserve stock and open a payment page
    pub async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<CheckoutResponse> {
        self.post("/api/checkout", request).await
    }

    /// Ask the server to confirm a payment on return from the gateway
    pub async fn verify_payment(&self, reference: &str) -> ClientResult<VerifyResponse> {
        let request = VerifyRequest {
            reference: reference.to_string(),
        };
        self.post("/api/verify-payment", &request).await
    }
}

/// Reason for a failure without a JSON body (proxies, gateways in front)
fn fallback_reason(status: reqwest::StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "validation",
        404 => "not_found",
        409 => "inventory_issue",
        502 => "gateway_error",
        _ => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = HttpClient::new(&ClientConfig::new("http://shop.test/")).unwrap();
        assert_eq!(client.url("/api/checkout"), "http://shop.test/api/checkout");
        assert_eq!(client.url("api/verify-payment"), "http://shop.test/api/verify-payment");
    }

    #[test]
    fn test_fallback_reason() {
        assert_eq!(fallback_reason(reqwest::StatusCode::CONFLICT), "inventory_issue");
        assert_eq!(fallback_reason(reqwest::StatusCode::BAD_GATEWAY), "gateway_error");
        assert_eq!(fallback_reason(reqwest::StatusCode::SERVICE_UNAVAILABLE), "internal");
    }
}

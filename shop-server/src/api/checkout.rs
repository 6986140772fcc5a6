//! Storefront checkout endpoints
//!
//! | Path | Method | Notes |
//! |------|--------|-------|
//! | /api/checkout | POST | reserve stock and open a payment page |
//! | /api/verify-payment | POST | verify fallback on return from the gateway |

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use shared::checkout::{CheckoutRequest, CheckoutResponse, VerifyRequest, VerifyResponse};
use shared::AppResult;

use super::json_body;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/checkout", post(checkout))
        .route("/api/verify-payment", post(verify_payment))
}

pub async fn checkout(
    State(state): State<ServerState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> AppResult<Json<CheckoutResponse>> {
    let request = json_body(payload)?;
    let response = state.checkout.checkout(request).await?;
    Ok(Json(response))
}

pub async fn verify_payment(
    State(state): State<ServerState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> AppResult<Json<VerifyResponse>> {
    let request = json_body(payload)?;
    let response = state.verify.verify(&request.reference).await?;
    Ok(Json(response))
}

//! Operator endpoints (bearer token)
//!
//! | Path | Method | Notes |
//! |------|--------|-------|
//! | /api/cleanup-orders | POST | run one reaper sweep |
//! | /api/admin/orders/{id} | GET | order, lines and transaction |
//! | /api/admin/orders/{id}/status | PATCH | post-payment status change |

use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use shared::checkout::{CleanupResponse, UpdateOrderStatus};
use shared::models::Order;
use shared::util::now_millis;
use shared::{AppError, AppResult, ErrorCode};

use super::json_body;
use crate::core::ServerState;
use crate::orders::{self, OrderDetail};
use crate::security_log;
use crate::utils::{blocking, secrets_match};

pub fn router(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/api/cleanup-orders", post(cleanup_orders))
        .route("/api/admin/orders/{id}", get(get_order))
        .route("/api/admin/orders/{id}/status", patch(update_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ))
}

/// Reject requests without `Authorization: Bearer {OPERATOR_TOKEN}`
pub async fn require_operator(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let expected = &state.config.operator_token;
    match token {
        Some(token) if !expected.is_empty() && secrets_match(expected, token) => {
            Ok(next.run(req).await)
        }
        Some(_) => {
            security_log!(WARN, "operator_token_rejected", uri = req.uri().path().to_string());
            Err(AppError::unauthorized())
        }
        None => {
            security_log!(WARN, "operator_token_missing", uri = req.uri().path().to_string());
            Err(AppError::unauthorized())
        }
    }
}

pub async fn cleanup_orders(State(state): State<ServerState>) -> AppResult<Json<CleanupResponse>> {
    let reaper = state.reaper.clone();
    let abandoned_count = blocking(move || reaper.sweep(now_millis())).await??;
    Ok(Json(CleanupResponse { abandoned_count }))
}

pub async fn get_order(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<OrderDetail>> {
    let storage = state.storage.clone();
    let lookup = id.clone();
    let detail = blocking(move || orders::order_detail(&storage, &lookup))
        .await??
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
                .with_detail("order_id", id)
        })?;
    Ok(Json(detail))
}

pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatus>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let request = json_body(payload)?;
    let storage = state.storage.clone();
    let order =
        blocking(move || orders::apply_transition(&storage, &id, request.status, now_millis()))
            .await??;
    Ok(Json(order))
}

//! HTTP API
//!
//! - [`health`] - liveness
//! - [`products`] - catalog read path
//! - [`checkout`] - checkout and verify fallback
//! - [`webhook`] - gateway webhooks
//! - [`operator`] - reaper trigger and order administration

pub mod checkout;
pub mod health;
pub mod operator;
pub mod products;
pub mod webhook;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use shared::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Every route, no middleware and no state
pub fn build_router(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(checkout::router())
        .merge(webhook::router())
        .merge(operator::router(state))
}

/// Router with middleware and state, used by the server and by tests
pub fn build_app(state: ServerState) -> Router {
    build_router(&state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a JSON extraction failure to a `validation` error
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::validation(e.body_text()))
}

//! Catalog read path
//!
//! | Path | Method | Notes |
//! |------|--------|-------|
//! | /api/products/{id} | GET | product plus `effective_price` |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::models::ProductView;
use shared::{AppError, AppResult, ErrorCode};

use crate::core::ServerState;
use crate::utils::blocking;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/products/{id}", get(get_by_id))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProductView>> {
    let storage = state.storage.clone();
    let lookup = id.clone();
    let product = blocking(move || storage.get_product(&lookup))
        .await??
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found"))
                .with_detail("product_id", id)
        })?;
    Ok(Json(product.into()))
}

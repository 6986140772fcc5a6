//! Catalog seed loading
//!
//! The catalog itself is owned by the admin side; the server only needs
//! rows to reserve against. A seed file inserts products that do not
//! exist yet and never touches existing rows, so a restart cannot reset
//! stock that reservations already consumed.

use rust_decimal::Decimal;
use shared::models::Product;
use std::path::Path;

use crate::core::{Result, ServerError};
use crate::store::ShopStorage;

/// Outcome of one seed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert products from a JSON array file, skipping ids already stored
pub fn seed_from_file(storage: &ShopStorage, path: &Path) -> Result<SeedReport> {
    let seed_err = |reason: String| ServerError::Seed {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| seed_err(e.to_string()))?;
    let products: Vec<Product> =
        serde_json::from_str(&content).map_err(|e| seed_err(e.to_string()))?;

    for product in &products {
        validate(product).map_err(|reason| seed_err(format!("product {}: {reason}", product.id)))?;
    }

    let mut report = SeedReport::default();
    for product in &products {
        if storage.insert_product_if_absent(product)? {
            report.inserted += 1;
        } else {
            report.skipped += 1;
        }
    }

    tracing::info!(
        path = %path.display(),
        inserted = report.inserted,
        skipped = report.skipped,
        "Catalog seed loaded"
    );
    Ok(report)
}

fn validate(product: &Product) -> std::result::Result<(), String> {
    if product.id.trim().is_empty() {
        return Err("empty id".into());
    }
    if product.price < Decimal::ZERO {
        return Err("negative price".into());
    }
    if product.stock < 0 {
        return Err("negative stock".into());
    }
    if let Some(discount) = &product.discount
        && discount.value < Decimal::ZERO
    {
        return Err("negative discount".into());
    }
    Ok(())
}

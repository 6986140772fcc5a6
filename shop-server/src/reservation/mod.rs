//! Reservation Service
//!
//! Reserves stock and creates the pending Order, its OrderItems and the
//! pending Transaction in one redb write transaction. Either everything
//! is committed or nothing is.

use rust_decimal::Decimal;
use shared::checkout::{CustomerInfo, Reservation, ReserveItem};
use shared::models::{GatewayKind, Order, OrderItem, OrderStatus, Transaction, TransactionStatus};
use shared::pricing::{effective_price, round_money};
use shared::util::new_reference;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::store::{ShopStorage, StorageError};

/// Reservation failures
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        let message = err.to_string();
        match err {
            ReservationError::EmptyOrder => AppError::new(ErrorCode::OrderEmpty),
            ReservationError::InvalidQuantity {
                product_id,
                quantity,
            } => AppError::with_message(ErrorCode::InvalidQuantity, message)
                .with_detail("product_id", product_id)
                .with_detail("quantity", quantity),
            ReservationError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found"))
                    .with_detail("product_id", id)
            }
            ReservationError::InsufficientStock {
                product_id,
                available,
                ..
            } => AppError::insufficient_stock(product_id, available),
            ReservationError::Storage(e) => e.into(),
        }
    }
}

/// Creates reservations against the shop store
#[derive(Clone)]
pub struct ReservationService {
    storage: ShopStorage,
    ttl_ms: i64,
    currency: String,
}

impl ReservationService {
    pub fn new(storage: ShopStorage, ttl_ms: i64, currency: impl Into<String>) -> Self {
        Self {
            storage,
            ttl_ms,
            currency: currency.into(),
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Reserve stock for `items` and create a pending order
    ///
    /// Prices are recomputed from the catalog. Runs synchronously; async
    /// callers go through `spawn_blocking`.
    pub fn reserve(
        &self,
        customer: &CustomerInfo,
        items: &[ReserveItem],
        gateway: GatewayKind,
        now: i64,
    ) -> Result<Reservation, ReservationError> {
        if items.is_empty() {
            return Err(ReservationError::EmptyOrder);
        }
        if let Some(bad) = items.iter().find(|i| i.quantity <= 0) {
            return Err(ReservationError::InvalidQuantity {
                product_id: bad.product_id.clone(),
                quantity: bad.quantity,
            });
        }

        let txn = self.storage.begin_write()?;

        let order_id = new_reference();
        let transaction_id = new_reference();
        let expires_at = now + self.ttl_ms;

        let mut lines = Vec::with_capacity(items.len());
        let mut total = Decimal::ZERO;

        for item in items {
            // Early returns drop `txn`, which aborts every write made so far
            let mut product = self
                .storage
                .get_product_txn(&txn, &item.product_id)?
                .ok_or_else(|| ReservationError::ProductNotFound(item.product_id.clone()))?;

            if product.stock < item.quantity {
                return Err(ReservationError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            let unit_price = effective_price(&product);
            product.stock -= item.quantity;
            self.storage.put_product(&txn, &product)?;

            let line = OrderItem {
                order_id: order_id.clone(),
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                base_price: product.price,
                unit_price,
                discount: product.discount.filter(|d| d.active),
            };
            total += line.subtotal();
            lines.push(line);
        }

        let total = round_money(total);

        let order = Order {
            id: order_id.clone(),
            email: customer.email.trim().to_string(),
            customer_name: customer.customer_name.trim().to_string(),
            phone: customer.phone.trim().to_string(),
            address: customer.address.trim().to_string(),
            total,
            status: OrderStatus::Pending,
            transaction_id: transaction_id.clone(),
            reserved_at: now,
            expires_at,
            updated_at: now,
        };

        let transaction = Transaction {
            id: transaction_id.clone(),
            order_id: order_id.clone(),
            amount: total,
            currency: self.currency.clone(),
            status: TransactionStatus::Pending,
            gateway,
            raw_response: None,
            created_at: now,
            settled_at: None,
        };

        self.storage.put_order(&txn, &order)?;
        self.storage.put_order_items(&txn, &order_id, &lines)?;
        self.storage.put_transaction(&txn, &transaction)?;
        self.storage
            .index_pending(&txn, expires_at, &order_id, &transaction_id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            transaction_id = %transaction_id,
            amount = %total,
            lines = lines.len(),
            "Reservation created"
        );

        Ok(Reservation {
            transaction_id,
            order_id,
            amount: total,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Discount, Product};
    use std::sync::{Arc, Barrier};

    const TTL_MS: i64 = 15 * 60 * 1000;
    const NOW: i64 = 1_750_000_000_000;

    fn create_test_service() -> (ShopStorage, ReservationService) {
        let storage = ShopStorage::open_in_memory().unwrap();
        let service = ReservationService::new(storage.clone(), TTL_MS, "NGN");
        (storage, service)
    }

    fn seed(storage: &ShopStorage, id: &str, price: i64, stock: i64, discount: Option<Discount>) {
        storage
            .upsert_product(&Product {
                id: id.to_string(),
                name: format!("Product {id}"),
                price: Decimal::from(price),
                stock,
                discount,
            })
            .unwrap();
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            email: "ada@example.com".into(),
            customer_name: "Ada Obi".into(),
            phone: "08012345678".into(),
            address: "12 Marina, Lagos".into(),
        }
    }

    fn item(product_id: &str, quantity: i64) -> ReserveItem {
        ReserveItem {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    fn stock(storage: &ShopStorage, id: &str) -> i64 {
        storage.get_product(id).unwrap().unwrap().stock
    }

    #[test]
    fn test_reserve_snapshots_discounted_price() {
        let (storage, service) = create_test_service();
        seed(&storage, "p", 1000, 5, Some(Discount::percentage(Decimal::from(10))));

        let reservation = service
            .reserve(&customer(), &[item("p", 2)], GatewayKind::Paystack, NOW)
            .unwrap();

        assert_eq!(reservation.amount, Decimal::from(1800));
        assert_eq!(reservation.expires_at, NOW + TTL_MS);
        assert_eq!(stock(&storage, "p"), 3);

        let order = storage.get_order(&reservation.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Decimal::from(1800));
        assert_eq!(order.transaction_id, reservation.transaction_id);

        let items = storage.get_order_items(&reservation.order_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, Decimal::from(900));
        assert_eq!(items[0].base_price, Decimal::from(1000));
        assert_eq!(items[0].quantity, 2);

        let tx = storage
            .get_transaction(&reservation.transaction_id)
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.amount, Decimal::from(1800));
        assert_eq!(tx.currency, "NGN");
        assert_eq!(tx.gateway, GatewayKind::Paystack);
        assert_eq!(storage.count_pending().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_survives_catalog_price_change() {
        let (storage, service) = create_test_service();
        seed(&storage, "p", 1000, 5, None);

        let reservation = service
            .reserve(&customer(), &[item("p", 1)], GatewayKind::Paystack, NOW)
            .unwrap();

        let mut product = storage.get_product("p").unwrap().unwrap();
        product.price = Decimal::from(5000);
        storage.upsert_product(&product).unwrap();

        let items = storage.get_order_items(&reservation.order_id).unwrap();
        assert_eq!(items[0].unit_price, Decimal::from(1000));
    }

    #[test]
    fn test_insufficient_stock_leaves_nothing_behind() {
        let (storage, service) = create_test_service();
        seed(&storage, "a", 100, 5, None);
        seed(&storage, "b", 100, 1, None);

        let err = service
            .reserve(
                &customer(),
                &[item("a", 2), item("b", 2)],
                GatewayKind::Paystack,
                NOW,
            )
            .unwrap_err();

        match err {
            ReservationError::InsufficientStock {
                ref product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, "b");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(AppError::from(err).reason(), "inventory_issue");

        // "a" was decremented inside the aborted transaction
        assert_eq!(stock(&storage, "a"), 5);
        assert_eq!(stock(&storage, "b"), 1);
        assert_eq!(storage.count_orders().unwrap(), 0);
        assert_eq!(storage.count_transactions().unwrap(), 0);
        assert_eq!(storage.count_pending().unwrap(), 0);
    }

    #[test]
    fn test_unknown_product_rolls_back() {
        let (storage, service) = create_test_service();
        seed(&storage, "a", 100, 5, None);

        let err = service
            .reserve(
                &customer(),
                &[item("a", 1), item("ghost", 1)],
                GatewayKind::Flutterwave,
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, ReservationError::ProductNotFound(ref id) if id == "ghost"));
        assert_eq!(stock(&storage, "a"), 5);
        assert_eq!(storage.count_orders().unwrap(), 0);
    }

    #[test]
    fn test_rejects_empty_and_non_positive_quantities() {
        let (storage, service) = create_test_service();
        seed(&storage, "a", 100, 5, None);

        assert!(matches!(
            service.reserve(&customer(), &[], GatewayKind::Paystack, NOW),
            Err(ReservationError::EmptyOrder)
        ));
        assert!(matches!(
            service.reserve(&customer(), &[item("a", 0)], GatewayKind::Paystack, NOW),
            Err(ReservationError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            service.reserve(&customer(), &[item("a", -1)], GatewayKind::Paystack, NOW),
            Err(ReservationError::InvalidQuantity { .. })
        ));
        assert_eq!(stock(&storage, "a"), 5);
    }

    #[test]
    fn test_repeated_product_lines_share_stock() {
        let (storage, service) = create_test_service();
        seed(&storage, "a", 100, 3, None);

        let err = service
            .reserve(
                &customer(),
                &[item("a", 2), item("a", 2)],
                GatewayKind::Paystack,
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, ReservationError::InsufficientStock { available: 1, .. }));
        assert_eq!(stock(&storage, "a"), 3);
    }

    #[test]
    fn test_last_unit_goes_to_exactly_one_buyer() {
        let (storage, service) = create_test_service();
        seed(&storage, "last", 500, 1, None);

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    service.reserve(&customer(), &[item("last", 1)], GatewayKind::Paystack, NOW)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let won = results.iter().filter(|r| r.is_ok()).count();
        let lost = results
            .iter()
            .filter(|r| matches!(r, Err(ReservationError::InsufficientStock { .. })))
            .count();

        assert_eq!(won, 1);
        assert_eq!(lost, 1);
        assert_eq!(stock(&storage, "last"), 0);
        assert_eq!(storage.count_orders().unwrap(), 1);
    }
}

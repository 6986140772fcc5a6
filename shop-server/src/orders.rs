//! Operator-driven order transitions
//!
//! Payment settlement owns `pending -> paid | abandoned | inventory_issue`.
//! Everything after `paid` (shipping, delivery, returns) is applied here.

use serde::Serialize;
use shared::models::{Order, OrderItem, OrderStatus, Transaction};
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::store::{ShopStorage, StorageError, StorageResult};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Status {0} is set by payment settlement only")]
    PaymentOwned(OrderStatus),

    #[error("Cannot move order from {from} to {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            TransitionError::PaymentOwned(_) => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
            }
            TransitionError::Invalid { from, to } => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            TransitionError::Storage(e) => e.into(),
        }
    }
}

/// Order with its lines and payment record
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub transaction: Option<Transaction>,
}

pub fn order_detail(storage: &ShopStorage, order_id: &str) -> StorageResult<Option<OrderDetail>> {
    let Some(order) = storage.get_order(order_id)? else {
        return Ok(None);
    };
    let items = storage.get_order_items(order_id)?;
    let transaction = storage.get_transaction(&order.transaction_id)?;
    Ok(Some(OrderDetail {
        order,
        items,
        transaction,
    }))
}

/// Apply an operator status change
pub fn apply_transition(
    storage: &ShopStorage,
    order_id: &str,
    target: OrderStatus,
    now: i64,
) -> Result<Order, TransitionError> {
    if target.is_payment_owned() || target == OrderStatus::Pending {
        return Err(TransitionError::PaymentOwned(target));
    }

    let txn = storage.begin_write()?;
    let mut order = storage
        .get_order_txn(&txn, order_id)?
        .ok_or_else(|| TransitionError::NotFound(order_id.to_string()))?;

    if order.status == OrderStatus::Pending || !order.status.can_transition_to(target) {
        return Err(TransitionError::Invalid {
            from: order.status,
            to: target,
        });
    }

    let from = order.status;
    order.status = target;
    order.updated_at = now;
    storage.put_order(&txn, &order)?;
    txn.commit().map_err(StorageError::from)?;

    tracing::info!(order_id = %order_id, from = %from, to = %target, "Order status updated");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ReservationService;
    use crate::settlement::SettlementHandler;
    use rust_decimal::Decimal;
    use shared::checkout::{CustomerInfo, Reservation, ReserveItem};
    use shared::models::{GatewayKind, Product};

    fn reserve(storage: &ShopStorage) -> Reservation {
        storage
            .upsert_product(&Product {
                id: "p".into(),
                name: "Lamp".into(),
                price: Decimal::from(100),
                stock: 5,
                discount: None,
            })
            .unwrap();
        ReservationService::new(storage.clone(), 900_000, "NGN")
            .reserve(
                &CustomerInfo {
                    email: "ada@example.com".into(),
                    customer_name: "Ada".into(),
                    phone: "0801".into(),
                    address: "Lagos".into(),
                },
                &[ReserveItem {
                    product_id: "p".into(),
                    quantity: 1,
                }],
                GatewayKind::Paystack,
                1_000,
            )
            .unwrap()
    }

    #[test]
    fn test_forward_transitions_after_paid() {
        let storage = ShopStorage::open_in_memory().unwrap();
        let r = reserve(&storage);
        SettlementHandler::new(storage.clone())
            .settle(&r.transaction_id, true, None)
            .unwrap();

        let order = apply_transition(&storage, &r.order_id, OrderStatus::Shipped, 2_000).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.updated_at, 2_000);

        // skipping ahead is allowed, going back is not
        apply_transition(&storage, &r.order_id, OrderStatus::Delivered, 3_000).unwrap();
        let err = apply_transition(&storage, &r.order_id, OrderStatus::Shipped, 4_000).unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));
    }

    #[test]
    fn test_paid_can_be_returned() {
        let storage = ShopStorage::open_in_memory().unwrap();
        let r = reserve(&storage);
        SettlementHandler::new(storage.clone())
            .settle(&r.transaction_id, true, None)
            .unwrap();

        let order = apply_transition(&storage, &r.order_id, OrderStatus::Returned, 2_000).unwrap();
        assert_eq!(order.status, OrderStatus::Returned);
    }

    #[test]
    fn test_pending_orders_are_payment_owned() {
        let storage = ShopStorage::open_in_memory().unwrap();
        let r = reserve(&storage);

        let err = apply_transition(&storage, &r.order_id, OrderStatus::Shipped, 2_000).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::Invalid {
                from: OrderStatus::Pending,
                ..
            }
        ));

        let err = apply_transition(&storage, &r.order_id, OrderStatus::Paid, 2_000).unwrap_err();
        assert!(matches!(err, TransitionError::PaymentOwned(OrderStatus::Paid)));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InvalidStatusTransition);
    }

    #[test]
    fn test_unknown_order() {
        let storage = ShopStorage::open_in_memory().unwrap();
        let err = apply_transition(&storage, "nope", OrderStatus::Shipped, 1).unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_order_detail() {
        let storage = ShopStorage::open_in_memory().unwrap();
        let r = reserve(&storage);

        let detail = order_detail(&storage, &r.order_id).unwrap().unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.transaction.unwrap().id, r.transaction_id);
        assert!(order_detail(&storage, "nope").unwrap().is_none());
    }
}

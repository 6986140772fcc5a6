//! Settlement Handler
//!
//! The single place where a pending Transaction/Order reaches a terminal
//! state. Webhooks, the verify fallback, checkout rollback and the reaper
//! all call [`SettlementHandler::settle`].
//!
//! The terminal-state check and every write happen inside one redb write
//! transaction, so concurrent callers for the same reference settle it at
//! most once: the first to commit wins, later callers see a terminal
//! status and return [`SettleOutcome::AlreadySettled`].

use serde_json::Value;
use shared::models::{OrderStatus, TransactionStatus};
use shared::util::now_millis;

use crate::store::{ShopStorage, StorageResult};

/// Result of a settle call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This call moved the transaction to `status`
    Settled {
        order_id: String,
        status: TransactionStatus,
        /// Order lines whose stock was put back
        restored_lines: usize,
    },
    /// Transaction was already terminal; nothing written
    AlreadySettled(TransactionStatus),
    /// No transaction with this reference; nothing written
    UnknownReference,
}

impl SettleOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

#[derive(Clone)]
pub struct SettlementHandler {
    storage: ShopStorage,
}

impl SettlementHandler {
    pub fn new(storage: ShopStorage) -> Self {
        Self { storage }
    }

    /// Resolve the transaction `reference` to success or failure
    ///
    /// - success: Transaction `success`, Order `paid`, stock untouched
    /// - failure: Transaction `failed`; if the Order is still `pending`,
    ///   stock is restored line by line and the Order becomes `abandoned`
    ///
    /// `payload` replaces the stored gateway response when present.
    /// Blocking; async callers go through `spawn_blocking`.
    pub fn settle(
        &self,
        reference: &str,
        success: bool,
        payload: Option<Value>,
    ) -> StorageResult<SettleOutcome> {
        let txn = self.storage.begin_write()?;

        let Some(mut transaction) = self.storage.get_transaction_txn(&txn, reference)? else {
            tracing::warn!(reference = %reference, "Settlement for unknown reference ignored");
            return Ok(SettleOutcome::UnknownReference);
        };

        if transaction.status.is_terminal() {
            tracing::info!(
                reference = %reference,
                status = ?transaction.status,
                "Transaction already settled, skipping"
            );
            return Ok(SettleOutcome::AlreadySettled(transaction.status));
        }

        let now = now_millis();
        let status = if success {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        };

        transaction.status = status;
        transaction.settled_at = Some(now);
        if payload.is_some() {
            transaction.raw_response = payload;
        }
        self.storage.put_transaction(&txn, &transaction)?;

        let mut restored_lines = 0;
        match self.storage.get_order_txn(&txn, &transaction.order_id)? {
            Some(mut order) if order.status == OrderStatus::Pending => {
                self.storage
                    .unindex_pending(&txn, order.expires_at, &order.id)?;

                if success {
                    order.status = OrderStatus::Paid;
                } else {
                    for line in self.storage.get_order_items_txn(&txn, &order.id)? {
                        match self.storage.get_product_txn(&txn, &line.product_id)? {
                            Some(mut product) => {
                                product.stock += line.quantity;
                                self.storage.put_product(&txn, &product)?;
                                restored_lines += 1;
                            }
                            None => tracing::warn!(
                                order_id = %order.id,
                                product_id = %line.product_id,
                                "Product no longer exists, stock not restored"
                            ),
                        }
                    }
                    order.status = OrderStatus::Abandoned;
                }

                order.updated_at = now;
                self.storage.put_order(&txn, &order)?;
            }
            Some(order) => tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                "Order is no longer pending, order status left unchanged"
            ),
            None => tracing::warn!(
                reference = %reference,
                order_id = %transaction.order_id,
                "Transaction has no order"
            ),
        }

        txn.commit()?;

        tracing::info!(
            reference = %reference,
            order_id = %transaction.order_id,
            status = ?status,
            restored_lines,
            "Transaction settled"
        );

        Ok(SettleOutcome::Settled {
            order_id: transaction.order_id,
            status,
            restored_lines,
        })
    }
}

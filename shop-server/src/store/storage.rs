//! redb-based storage for the reservation core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Catalog rows (core writes `stock` only) |
//! | `orders` | `order_id` | `Order` | Orders |
//! | `order_items` | `(order_id, line)` | `OrderItem` | Immutable price snapshots |
//! | `transactions` | `transaction_id` | `Transaction` | Payment attempts, keyed by gateway reference |
//! | `pending_expiry` | `(expires_at, order_id)` | `transaction_id` | Index of pending reservations for the reaper |
//!
//! # Isolation
//!
//! redb runs one write transaction at a time. Every read-check-write
//! sequence on stock or transaction status happens inside a single
//! `WriteTransaction`, so concurrent callers are serialized and never
//! observe each other's intermediate state. Dropping a `WriteTransaction`
//! without committing discards all of its writes.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{Order, OrderItem, Product, Transaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = (order_id, line index), value = JSON-serialized OrderItem
const ORDER_ITEMS_TABLE: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("order_items");

/// key = transaction_id, value = JSON-serialized Transaction
const TRANSACTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// key = (expires_at millis, order_id), value = transaction_id
const PENDING_EXPIRY_TABLE: TableDefinition<(i64, &str), &str> =
    TableDefinition::new("pending_expiry");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage error");
        shared::AppError::database(err.to_string())
    }
}

/// A reservation still waiting for payment, as seen by the reaper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub expires_at: i64,
    pub order_id: String,
    pub transaction_id: String,
}

/// Shop storage backed by redb
#[derive(Clone)]
pub struct ShopStorage {
    db: Arc<Database>,
}

impl ShopStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(PENDING_EXPIRY_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// Blocks until any other write transaction has committed or aborted.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Products ==========

    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Insert or replace a catalog row (catalog collaborator path)
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_product(&txn, product)?;
        txn.commit()?;
        Ok(())
    }

    /// Insert a product only if no row with its id exists
    ///
    /// Returns `true` if inserted. Existing stock is never overwritten.
    pub fn insert_product_if_absent(&self, product: &Product) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        if self.get_product_txn(&txn, &product.id)?.is_some() {
            return Ok(false);
        }
        self.put_product(&txn, product)?;
        txn.commit()?;
        Ok(true)
    }

    // ========== Orders ==========

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn count_orders(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Order Items ==========

    /// Write all lines of an order
    pub fn put_order_items(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        items: &[OrderItem],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        for (line, item) in items.iter().enumerate() {
            let value = serde_json::to_vec(item)?;
            table.insert((order_id, line as u32), value.as_slice())?;
        }
        Ok(())
    }

    pub fn get_order_items(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.range((order_id, 0u32)..=(order_id, u32::MAX))? {
            let (_, value) = entry?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    pub fn get_order_items_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for entry in table.range((order_id, 0u32)..=(order_id, u32::MAX))? {
            let (_, value) = entry?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    // ========== Transactions ==========

    pub fn get_transaction(&self, transaction_id: &str) -> StorageResult<Option<Transaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;
        match table.get(transaction_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_transaction_txn(
        &self,
        txn: &WriteTransaction,
        transaction_id: &str,
    ) -> StorageResult<Option<Transaction>> {
        let table = txn.open_table(TRANSACTIONS_TABLE)?;
        match table.get(transaction_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_transaction(
        &self,
        txn: &WriteTransaction,
        transaction: &Transaction,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
        let value = serde_json::to_vec(transaction)?;
        table.insert(transaction.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Store raw bytes as a transaction row (for testing unreadable records)
    #[cfg(test)]
    pub(crate) fn put_raw_transaction(&self, transaction_id: &str, bytes: &[u8]) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
            table.insert(transaction_id, bytes)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn count_transactions(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Pending Expiry Index ==========

    pub fn index_pending(
        &self,
        txn: &WriteTransaction,
        expires_at: i64,
        order_id: &str,
        transaction_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_EXPIRY_TABLE)?;
        table.insert((expires_at, order_id), transaction_id)?;
        Ok(())
    }

    pub fn unindex_pending(
        &self,
        txn: &WriteTransaction,
        expires_at: i64,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_EXPIRY_TABLE)?;
        table.remove((expires_at, order_id))?;
        Ok(())
    }

    /// Pending reservations whose `expires_at` is strictly before `now`,
    /// oldest first
    pub fn expired_pending(&self, now: i64) -> StorageResult<Vec<PendingEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_EXPIRY_TABLE)?;
        let mut expired = Vec::new();
        // "" sorts before every order id, so the bound excludes expires_at == now
        for entry in table.range(..(now, ""))? {
            let (key, value) = entry?;
            let (expires_at, order_id) = key.value();
            expired.push(PendingEntry {
                expires_at,
                order_id: order_id.to_string(),
                transaction_id: value.value().to_string(),
            });
        }
        Ok(expired)
    }

    pub fn count_pending(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_EXPIRY_TABLE)?;
        Ok(table.len()?)
    }
}

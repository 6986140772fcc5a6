//! Reaper
//!
//! Releases reservations whose TTL ran out without a payment outcome.
//! Each expired entry is settled as a failure through the settlement
//! handler, so a webhook racing the sweep for the same transaction is
//! harmless: whichever commits first wins.

use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use shared::util::now_millis;

use crate::settlement::{SettleOutcome, SettlementHandler};
use crate::store::{ShopStorage, StorageResult};

#[derive(Clone)]
pub struct Reaper {
    storage: ShopStorage,
    settlement: SettlementHandler,
}

impl Reaper {
    pub fn new(storage: ShopStorage, settlement: SettlementHandler) -> Self {
        Self {
            storage,
            settlement,
        }
    }

    /// Abandon every pending order with `expires_at < now`
    ///
    /// Returns how many orders this sweep released. A failure on one order
    /// is logged and the sweep moves on.
    pub fn sweep(&self, now: i64) -> StorageResult<usize> {
        let expired = self.storage.expired_pending(now)?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut abandoned = 0;
        for entry in &expired {
            match self.settlement.settle(&entry.transaction_id, false, None) {
                Ok(SettleOutcome::Settled { .. }) => abandoned += 1,
                Ok(outcome) => tracing::debug!(
                    order_id = %entry.order_id,
                    outcome = ?outcome,
                    "Expired reservation already resolved"
                ),
                Err(e) => tracing::error!(
                    order_id = %entry.order_id,
                    transaction_id = %entry.transaction_id,
                    error = %e,
                    "Failed to release expired reservation"
                ),
            }
        }

        tracing::info!(
            expired = expired.len(),
            abandoned,
            "Reaper sweep finished"
        );
        Ok(abandoned)
    }

    /// Sweep every `interval` until `shutdown` fires
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        tracing::info!(interval_secs = interval.as_secs(), "Reaper started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Reaper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let reaper = self.clone();
                    match tokio::task::spawn_blocking(move || reaper.sweep(now_millis())).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Reaper sweep failed"),
                        Err(e) => tracing::error!(error = %e, "Reaper sweep panicked"),
                    }
                }
            }
        }
    }
}

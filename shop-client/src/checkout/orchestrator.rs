use async_trait::async_trait;
use shared::checkout::{CheckoutRequest, CheckoutResponse, VerifyResponse, VerifyStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::state::{CheckoutFailure, CheckoutState, FailureReason, PendingCheckout};
use super::store::PendingStore;
use crate::{ClientResult, HttpClient};

/// Server calls the orchestrator needs
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<CheckoutResponse>;
    async fn verify_payment(&self, reference: &str) -> ClientResult<VerifyResponse>;
}

#[async_trait]
impl CheckoutApi for HttpClient {
    async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<CheckoutResponse> {
        HttpClient::checkout(self, request).await
    }

    async fn verify_payment(&self, reference: &str) -> ClientResult<VerifyResponse> {
        HttpClient::verify_payment(self, reference).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// New reservation made
    Reserved(PendingCheckout),
    /// A live reservation already exists; nothing was sent
    Existing(PendingCheckout),
    /// Another submit is in flight; nothing was sent
    Ignored,
    Failed(CheckoutFailure),
}

/// Clears the in-flight flag however submit returns
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CheckoutOrchestrator<A> {
    api: A,
    store: PendingStore,
    state: Mutex<CheckoutState>,
    in_flight: AtomicBool,
}

impl<A: CheckoutApi> CheckoutOrchestrator<A> {
    pub fn new(api: A, store: PendingStore) -> Self {
        Self {
            api,
            store,
            state: Mutex::new(CheckoutState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CheckoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: CheckoutState) {
        *self.lock() = state;
    }

    pub fn state(&self) -> CheckoutState {
        self.lock().clone()
    }

    /// Pick up a reservation made before a reload instead of reserving again
    pub fn resume(&self, now: i64) -> ClientResult<Option<PendingCheckout>> {
        let pending = self.store.resume(now)?;
        if let Some(p) = &pending {
            tracing::info!(reservation_id = %p.reservation_id, "Resumed pending checkout");
            self.set(CheckoutState::Ready(p.clone()));
        }
        Ok(pending)
    }

    /// Reserve stock once per form submission
    pub async fn submit(&self, form: CheckoutRequest, now: i64) -> SubmitOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Checkout already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        }
        let _guard = InFlight(&self.in_flight);

        if let CheckoutState::Ready(p) | CheckoutState::Expired(p) = self.state() {
            if !p.is_expired(now) {
                return SubmitOutcome::Existing(p);
            }
            if let Err(e) = self.store.remove(&p.reservation_id) {
                tracing::warn!(reservation_id = %p.reservation_id, error = %e, "Failed to clear expired checkout");
            }
        }

        self.set(CheckoutState::Submitting);

        match self.api.checkout(&form).await {
            Ok(response) => {
                let pending = PendingCheckout::from_response(response, form);
                if let Err(e) = self.store.save(&pending) {
                    tracing::warn!(
                        reservation_id = %pending.reservation_id,
                        error = %e,
                        "Failed to persist pending checkout"
                    );
                }
                tracing::info!(
                    reservation_id = %pending.reservation_id,
                    expires_at = pending.expires_at,
                    "Checkout reserved"
                );
                self.set(CheckoutState::Ready(pending.clone()));
                SubmitOutcome::Reserved(pending)
            }
            Err(e) => {
                let failure = CheckoutFailure::from(&e);
                tracing::warn!(reason = ?failure.reason, error = %e, "Checkout failed");
                self.set(CheckoutState::Error(failure.clone()));
                SubmitOutcome::Failed(failure)
            }
        }
    }

    /// Advance the countdown; `ready` becomes `expired` once the window passes
    pub fn tick(&self, now: i64) -> CheckoutState {
        let mut state = self.lock();
        let expired = match &*state {
            CheckoutState::Ready(p) if p.is_expired(now) => Some(p.clone()),
            _ => None,
        };
        if let Some(p) = expired {
            if let Err(e) = self.store.remove(&p.reservation_id) {
                tracing::warn!(reservation_id = %p.reservation_id, error = %e, "Failed to clear expired checkout");
            }
            *state = CheckoutState::Expired(p);
        }
        (*state).clone()
    }

    pub fn time_left(&self, now: i64) -> Option<Duration> {
        self.lock().pending().map(|p| p.time_left(now))
    }

    /// Confirm the payment after the gateway redirects back
    ///
    /// Success and failure are final and clear local state; pending keeps
    /// the reservation so the buyer can check again.
    pub async fn verify_on_return(&self, reference: &str) -> ClientResult<VerifyStatus> {
        let response = self.api.verify_payment(reference).await?;

        match response.status {
            VerifyStatus::Success => {
                self.store.remove(reference)?;
                self.set(CheckoutState::Idle);
            }
            VerifyStatus::Failed => {
                self.store.remove(reference)?;
                self.set(CheckoutState::Error(CheckoutFailure::new(
                    FailureReason::PaymentFailed,
                    response
                        .message
                        .unwrap_or_else(|| "Payment was not completed".to_string()),
                )));
            }
            VerifyStatus::Pending => {}
        }

        Ok(response.status)
    }

    /// Drop whatever is in progress and return to `idle`
    pub fn reset(&self) -> ClientResult<()> {
        let mut state = self.lock();
        if let CheckoutState::Ready(p) | CheckoutState::Expired(p) = &*state {
            self.store.remove(&p.reservation_id)?;
        }
        *state = CheckoutState::Idle;
        Ok(())
    }
}

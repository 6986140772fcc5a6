//! Checkout Service
//!
//! reserve → initialize. A reservation whose payment cannot be opened is
//! released through the settlement handler before the error is returned,
//! so no stock stays held for a payment page that never existed.

use serde_json::json;
use shared::checkout::{CheckoutRequest, CheckoutResponse, Reservation};
use shared::util::now_millis;
use shared::{AppError, AppResult};
use std::time::Duration;

use crate::gateway::{GatewayError, GatewayRegistry, InitializeRequest};
use crate::reservation::ReservationService;
use crate::settlement::SettlementHandler;
use crate::utils::blocking;

#[derive(Clone)]
pub struct CheckoutService {
    reservations: ReservationService,
    settlement: SettlementHandler,
    gateways: GatewayRegistry,
    /// Where gateways send the buyer after payment
    redirect_url: String,
    /// Upper bound for one initialize call
    init_timeout: Duration,
}

impl CheckoutService {
    pub fn new(
        reservations: ReservationService,
        settlement: SettlementHandler,
        gateways: GatewayRegistry,
        public_base_url: &str,
        init_timeout: Duration,
    ) -> Self {
        Self {
            reservations,
            settlement,
            gateways,
            redirect_url: format!("{}/success", public_base_url.trim_end_matches('/')),
            init_timeout,
        }
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Validate, reserve stock and open a hosted payment page
    pub async fn checkout(&self, request: CheckoutRequest) -> AppResult<CheckoutResponse> {
        request.check()?;

        let kind = request.gateway.unwrap_or(self.gateways.default_kind());
        // Resolve before reserving; an unknown gateway must not hold stock
        let gateway = self.gateways.get(kind)?;

        let reservations = self.reservations.clone();
        let customer = request.customer.clone();
        let items = request.items.clone();
        let reservation = blocking(move || {
            reservations.reserve(&customer, &items, kind, now_millis())
        })
        .await??;

        let init = InitializeRequest {
            reference: reservation.transaction_id.clone(),
            amount: reservation.amount,
            currency: self.reservations.currency().to_string(),
            email: request.customer.email.trim().to_string(),
            customer_name: request.customer.customer_name.trim().to_string(),
            phone: request.customer.phone.trim().to_string(),
            redirect_url: self.redirect_url.clone(),
        };

        let error = match tokio::time::timeout(self.init_timeout, gateway.initialize(&init)).await
        {
            Ok(Ok(payment_url)) => {
                tracing::info!(
                    transaction_id = %reservation.transaction_id,
                    gateway = %kind,
                    amount = %reservation.amount,
                    "Checkout ready"
                );
                return Ok(CheckoutResponse {
                    transaction_id: reservation.transaction_id,
                    amount: reservation.amount,
                    currency: init.currency,
                    expires_at: reservation.expires_at,
                    payment_url,
                    gateway: kind,
                });
            }
            Ok(Err(e)) => e,
            Err(_) => GatewayError::Timeout(kind),
        };

        tracing::warn!(
            transaction_id = %reservation.transaction_id,
            gateway = %kind,
            error = %error,
            "Payment initialization failed, releasing reservation"
        );
        self.release(&reservation, &error).await;

        Err(error.into())
    }

    /// Roll back a reservation whose payment was never opened
    async fn release(&self, reservation: &Reservation, error: &GatewayError) {
        let settlement = self.settlement.clone();
        let reference = reservation.transaction_id.clone();
        let payload = json!({
            "stage": "initialize",
            "error": error.to_string(),
        });

        let result = blocking(move || settlement.settle(&reference, false, Some(payload)))
            .await
            .and_then(|r| r.map_err(AppError::from));

        // On failure the reaper releases it at expiry
        if let Err(e) = result {
            tracing::error!(
                transaction_id = %reservation.transaction_id,
                error = %e,
                "Failed to release reservation"
            );
        }
    }
}

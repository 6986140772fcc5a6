//! Server state shared by every handler

use std::sync::Arc;

use crate::catalog;
use crate::checkout::{CheckoutService, VerifyService};
use crate::gateway::{FlutterwaveGateway, GatewayRegistry, PaystackGateway};
use crate::reaper::Reaper;
use crate::reservation::ReservationService;
use crate::settlement::SettlementHandler;
use crate::store::ShopStorage;

use super::tasks::BackgroundTasks;
use super::{Config, Result};

/// Cheap to clone; every service is `Clone` over the same store
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub storage: ShopStorage,
    pub settlement: SettlementHandler,
    pub gateways: GatewayRegistry,
    pub checkout: CheckoutService,
    pub verify: VerifyService,
    pub reaper: Reaper,
}

impl ServerState {
    /// Open the store, load the catalog seed and configure gateways
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = ShopStorage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Shop store opened");

        if let Some(seed) = &config.catalog_seed_path {
            catalog::seed_from_file(&storage, seed)?;
        }

        let gateways = build_gateways(config)?;
        Ok(Self::build(config.clone(), storage, gateways))
    }

    /// Wire services over an existing store and gateway set
    pub fn build(config: Config, storage: ShopStorage, gateways: GatewayRegistry) -> Self {
        let settlement = SettlementHandler::new(storage.clone());
        let reservations = ReservationService::new(
            storage.clone(),
            config.reservation_ttl_ms(),
            config.currency.clone(),
        );
        let checkout = CheckoutService::new(
            reservations,
            settlement.clone(),
            gateways.clone(),
            &config.public_base_url,
            config.gateway_timeout,
        );
        let verify = VerifyService::new(
            storage.clone(),
            settlement.clone(),
            gateways.clone(),
            config.verify_settles_success,
        );
        let reaper = Reaper::new(storage.clone(), settlement.clone());

        Self {
            config: Arc::new(config),
            storage,
            settlement,
            gateways,
            checkout,
            verify,
            reaper,
        }
    }

    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let reaper = self.reaper.clone();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("reaper", reaper.run(self.config.reaper_interval, shutdown));
        tasks.log_summary();
    }
}

/// Gateways with credentials configured; the default one is mandatory
fn build_gateways(config: &Config) -> Result<GatewayRegistry> {
    let mut registry = GatewayRegistry::new(config.default_gateway);

    if !config.paystack_secret_key.is_empty() {
        registry = registry.with(Arc::new(PaystackGateway::new(
            config.paystack_base_url.clone(),
            config.paystack_secret_key.clone(),
            config.gateway_timeout,
        )?));
    }

    if !config.flutterwave_secret_key.is_empty() {
        let gateway = FlutterwaveGateway::new(
            config.flutterwave_base_url.clone(),
            config.flutterwave_secret_key.clone(),
            config.flutterwave_secret_hash.clone(),
            config.gateway_timeout,
        )?
        .with_branding(
            config.store_title.clone(),
            config.flutterwave_logo_url.clone(),
        );
        registry = registry.with(Arc::new(gateway));
    }

    registry.get(config.default_gateway)?;
    Ok(registry)
}

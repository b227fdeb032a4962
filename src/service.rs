//! Service layer API for the marketplace trade core
use std::sync::Arc;

use sled::Db;
use tracing::info;

use super::config::MarketConfig;
use super::error::{MarketError, MarketResult};
use super::model::{Item, Role, Trade};
use super::store::Store;
use super::traits::{
    BlobStorage, CheckoutProvider, Clock, FsBlobStorage, LogNotifier, Notifier, SystemClock,
};
use super::types::{ItemId, TradeId, UserId};

/// The external systems the core calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub checkout: Arc<dyn CheckoutProvider>,
    pub blobs: Arc<dyn BlobStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Filesystem blobs, log based notices and the system clock around the
    /// given checkout provider.
    pub fn with_checkout(config: &MarketConfig, checkout: Arc<dyn CheckoutProvider>) -> Self {
        Self {
            checkout,
            blobs: Arc::new(FsBlobStorage::new(config.blob_dir.clone())),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }
}

pub struct MarketService {
    pub(crate) store: Store,
    pub(crate) config: MarketConfig,
    pub(crate) collaborators: Collaborators,
}

impl MarketService {
    pub fn new(
        instance: Arc<Db>,
        config: MarketConfig,
        collaborators: Collaborators,
    ) -> MarketResult<Self> {
        Ok(Self {
            store: Store::open(instance)?,
            config,
            collaborators,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Put a listing into the catalog. Listings are immutable once stored.
    pub fn list_item(&self, seller: UserId, name: &str, price: u64) -> MarketResult<Item> {
        let mut item = Item::new(seller, name, price);
        item.listed_at = self.collaborators.clock.now();
        item.validate()?;
        self.store.put_item(&item)?;

        info!(item = %item.id, seller = %seller, price, "item listed");
        Ok(item)
    }

    pub fn item(&self, id: &ItemId) -> MarketResult<Item> {
        self.store.require_item(id)
    }

    pub fn is_sold(&self, id: &ItemId) -> MarketResult<bool> {
        self.store.is_sold(id)
    }

    /// Load a trade and resolve which side `actor` is on. Non-parties are
    /// rejected.
    pub(crate) fn trade_for_party(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
    ) -> MarketResult<(Trade, Role)> {
        let trade = self.store.require_trade(trade_id)?;
        match trade.role_of(actor) {
            Some(role) => Ok((trade, role)),
            None => Err(MarketError::Forbidden(format!(
                "user {actor} is not a party to trade {trade_id}"
            ))),
        }
    }
}

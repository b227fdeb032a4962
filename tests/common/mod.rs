#![allow(dead_code)]

use std::sync::Arc;

use flea_trade::mocks::{MockBlobStorage, MockCheckout, MockClock, MockNotifier};
use flea_trade::{
    Collaborators, Item, MarketConfig, MarketService, PaymentMethod, Purchase, PurchaseOrder,
    ShippingSnapshot, UserId,
};
use tempfile::{TempDir, tempdir};

/// A service on a throwaway sled database with every collaborator mocked.
/// Keep the harness alive for the duration of the test; dropping it removes
/// the database directory.
pub struct Harness {
    pub market: Arc<MarketService>,
    pub checkout: MockCheckout,
    pub blobs: MockBlobStorage,
    pub notifier: MockNotifier,
    pub clock: MockClock,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempdir()?;
        let db = Arc::new(sled::open(dir.path().join("market.db"))?);

        let checkout = MockCheckout::new();
        let blobs = MockBlobStorage::new();
        let notifier = MockNotifier::new();
        let clock = MockClock::default_time();
        let collaborators = Collaborators {
            checkout: Arc::new(checkout.clone()),
            blobs: Arc::new(blobs.clone()),
            notifier: Arc::new(notifier.clone()),
            clock: Arc::new(clock.clone()),
        };
        let config = MarketConfig {
            data_dir: dir.path().to_path_buf(),
            blob_dir: dir.path().join("storage"),
            ..MarketConfig::default()
        };
        let market = Arc::new(MarketService::new(db, config, collaborators)?);

        Ok(Self {
            market,
            checkout,
            blobs,
            notifier,
            clock,
            _dir: dir,
        })
    }

    pub fn list(&self, seller: UserId, name: &str, price: u64) -> anyhow::Result<Item> {
        Ok(self.market.list_item(seller, name, price)?)
    }

    /// List an item for a fresh seller and sell it to a fresh buyer.
    pub fn sold_trade(&self) -> anyhow::Result<(UserId, UserId, Purchase)> {
        let seller = UserId::new();
        let buyer = UserId::new();
        let item = self.list(seller, "Wristwatch", 15_000)?;
        let purchase = self.market.commit_purchase(&buyer, &order_for(&item))?;
        Ok((seller, buyer, purchase))
    }
}

pub fn shipping() -> ShippingSnapshot {
    ShippingSnapshot::new("123-4567", "1-1 Chiyoda, Tokyo")
}

pub fn order_for(item: &Item) -> PurchaseOrder {
    PurchaseOrder::new(item.id, PaymentMethod::ConvenienceStore, shipping())
}

pub fn png() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()
}

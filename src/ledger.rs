//! Purchase ledger: the single committed sale of an item.
//!
//! A sale writes the purchase, its trade, the per-item uniqueness entry and
//! both per-user indexes in one sled transaction. sled transactions are
//! serializable, so of two commits racing for the same item the second is
//! re-run against the first one's writes, finds the item sold and aborts.
use sled::Transactional;
use sled::transaction::ConflictableTransactionError;
use tracing::{debug, info};

use super::error::{MarketError, MarketResult};
use super::model::{Item, Purchase, PurchaseOrder, Role, Trade};
use super::service::MarketService;
use super::store::{decode, encode, into_market_error};
use super::types::{ItemId, PurchaseId, TradeId, UserId};
use super::utils::compound_key;

// Lift a domain result into the transaction, aborting on error.
fn in_tx<T>(result: MarketResult<T>) -> Result<T, ConflictableTransactionError<MarketError>> {
    result.map_err(ConflictableTransactionError::Abort)
}

/// Checks that hold for both checkout and commit: the item exists, the buyer
/// is not its seller and nobody bought it yet.
pub(crate) fn ensure_purchasable(
    item: Option<Item>,
    buyer: &UserId,
    sold: bool,
    item_ref: &impl std::fmt::Display,
) -> MarketResult<Item> {
    let item = item.ok_or_else(|| MarketError::NotFound(format!("item {item_ref}")))?;
    if item.seller == *buyer {
        return Err(MarketError::Forbidden("cannot buy own listing".into()));
    }
    if sold {
        return Err(MarketError::Conflict(format!("item {} is already sold", item.id)));
    }
    Ok(item)
}

impl MarketService {
    /// Record the sale of `order.item_id` to `buyer` and open its trade.
    pub fn commit_purchase(&self, buyer: &UserId, order: &PurchaseOrder) -> MarketResult<Purchase> {
        order.validate()?;

        let now = self.collaborators.clock.now();
        let purchase_id = PurchaseId::new();
        let trade_id = TradeId::new();
        let item_key = order.item_id.as_bytes();
        let store = &self.store;

        let purchase = (
            &store.items,
            &store.purchases,
            &store.purchase_by_item,
            &store.trades,
            &store.user_purchases,
            &store.user_trades,
        )
            .transaction(
                |(items, purchases, purchase_by_item, trades, user_purchases, user_trades)| {
                    let item = in_tx(items.get(item_key)?.map(|b| decode::<Item>(&b)).transpose())?;
                    let sold = purchase_by_item.get(item_key)?.is_some();
                    let item = in_tx(ensure_purchasable(item, buyer, sold, &order.item_id))?;

                    let purchase = Purchase {
                        id: purchase_id,
                        buyer: *buyer,
                        item_id: item.id,
                        payment_method: order.payment_method,
                        shipping: order.shipping.clone(),
                        trade_id,
                        created_at: now.clone(),
                    };
                    let trade = Trade {
                        id: trade_id,
                        purchase_id,
                        item_id: item.id,
                        buyer: *buyer,
                        seller: item.seller,
                        is_complete: false,
                        created_at: now.clone(),
                        completed_at: None,
                    };
                    let purchase_bytes = in_tx(encode(&purchase))?;
                    let trade_bytes = in_tx(encode(&trade))?;
                    let buyer_role = in_tx(encode(&Role::Buyer))?;
                    let seller_role = in_tx(encode(&Role::Seller))?;

                    purchases.insert(&purchase_id.as_bytes()[..], purchase_bytes)?;
                    purchase_by_item.insert(&item_key[..], &purchase_id.as_bytes()[..])?;
                    trades.insert(&trade_id.as_bytes()[..], trade_bytes)?;
                    user_purchases.insert(
                        &compound_key(buyer.as_bytes(), purchase_id.as_bytes())[..],
                        &[] as &[u8],
                    )?;
                    user_trades.insert(
                        &compound_key(buyer.as_bytes(), trade_id.as_bytes())[..],
                        buyer_role,
                    )?;
                    user_trades.insert(
                        &compound_key(item.seller.as_bytes(), trade_id.as_bytes())[..],
                        seller_role,
                    )?;

                    Ok(purchase)
                },
            )
            .map_err(into_market_error);

        match &purchase {
            Ok(purchase) => info!(
                purchase = %purchase.id,
                trade = %purchase.trade_id,
                item = %purchase.item_id,
                buyer = %buyer,
                payment = purchase.payment_method.code(),
                "purchase committed"
            ),
            Err(e) => debug!(
                item = %order.item_id,
                buyer = %buyer,
                error = %e,
                "purchase rejected"
            ),
        }
        purchase
    }

    pub fn purchase_for_item(&self, item: &ItemId) -> MarketResult<Option<Purchase>> {
        self.store.purchase_for_item(item)
    }
}

//! sled-backed record store
//!
//! Each record kind lives in its own tree keyed by raw id bytes. Composite
//! keys (`owner ++ id`) back the per-user indexes and the per-trade message and
//! rating trees, so a prefix scan yields everything belonging to one owner.
use std::sync::Arc;

use sled::{Db, Transactional, Tree};
use tracing::debug;

use super::error::{MarketError, MarketResult};
use super::model::{Item, Purchase, RatingEdge, Role, Trade, TradeMessage, TradeRecord};
use super::types::{ItemId, MessageId, PurchaseId, TimeStamp, TradeId, UserId};
use super::utils::{compound_key, key_suffix};
use chrono::Utc;
use sled::transaction::ConflictableTransactionError;

const ITEMS: &str = "items";
const PURCHASES: &str = "purchases";
const PURCHASE_BY_ITEM: &str = "purchase_by_item";
const TRADES: &str = "trades";
const MESSAGES: &str = "trade_messages";
const RATINGS: &str = "trade_ratings";
const USER_ITEMS: &str = "user_items";
const USER_PURCHASES: &str = "user_purchases";
const USER_TRADES: &str = "user_trades";

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> MarketResult<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| MarketError::Codec(e.to_string()))
}

pub(crate) fn decode<T>(bytes: &[u8]) -> MarketResult<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    minicbor::decode(bytes).map_err(|e| MarketError::Codec(e.to_string()))
}

#[derive(Clone)]
pub struct Store {
    instance: Arc<Db>,
    pub(crate) items: Tree,
    pub(crate) purchases: Tree,
    pub(crate) purchase_by_item: Tree,
    pub(crate) trades: Tree,
    pub(crate) messages: Tree,
    pub(crate) ratings: Tree,
    pub(crate) user_items: Tree,
    pub(crate) user_purchases: Tree,
    pub(crate) user_trades: Tree,
}

impl Store {
    pub fn open(instance: Arc<Db>) -> MarketResult<Self> {
        Ok(Self {
            items: instance.open_tree(ITEMS)?,
            purchases: instance.open_tree(PURCHASES)?,
            purchase_by_item: instance.open_tree(PURCHASE_BY_ITEM)?,
            trades: instance.open_tree(TRADES)?,
            messages: instance.open_tree(MESSAGES)?,
            ratings: instance.open_tree(RATINGS)?,
            user_items: instance.open_tree(USER_ITEMS)?,
            user_purchases: instance.open_tree(USER_PURCHASES)?,
            user_trades: instance.open_tree(USER_TRADES)?,
            instance,
        })
    }

    pub fn flush(&self) -> MarketResult<()> {
        self.instance.flush()?;
        Ok(())
    }

    // ----- catalog -----

    /// Insert a listing and its seller index entry together.
    pub fn put_item(&self, item: &Item) -> MarketResult<()> {
        let bytes = encode(item)?;
        let index_key = compound_key(item.seller.as_bytes(), item.id.as_bytes());

        (&self.items, &self.user_items)
            .transaction(|(items, user_items)| {
                if items.get(item.id.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(MarketError::Conflict(
                        format!("item {} is already listed", item.id),
                    )));
                }
                items.insert(&item.id.as_bytes()[..], bytes.as_slice())?;
                user_items.insert(&index_key[..], &[] as &[u8])?;
                Ok(())
            })
            .map_err(into_market_error)
    }

    pub fn item(&self, id: &ItemId) -> MarketResult<Option<Item>> {
        self.items
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn require_item(&self, id: &ItemId) -> MarketResult<Item> {
        self.item(id)?
            .ok_or_else(|| MarketError::NotFound(format!("item {id}")))
    }

    pub fn items_of(&self, seller: &UserId) -> MarketResult<Vec<Item>> {
        let mut items = Vec::new();
        for entry in self.user_items.scan_prefix(seller.as_bytes()) {
            let (key, _) = entry?;
            let Some(id) = key_suffix(&key) else { continue };
            if let Some(item) = self.item(&ItemId::from_bytes(id))? {
                items.push(item);
            }
        }
        Ok(items)
    }

    // ----- ledger -----

    pub fn is_sold(&self, item: &ItemId) -> MarketResult<bool> {
        Ok(self.purchase_by_item.contains_key(item.as_bytes())?)
    }

    pub fn purchase(&self, id: &PurchaseId) -> MarketResult<Option<Purchase>> {
        self.purchases
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn purchase_for_item(&self, item: &ItemId) -> MarketResult<Option<Purchase>> {
        match self.purchase_by_item.get(item.as_bytes())? {
            Some(id) => {
                let id = key_suffix(&id)
                    .ok_or_else(|| MarketError::Codec("malformed purchase index".into()))?;
                self.purchase(&PurchaseId::from_bytes(id))
            }
            None => Ok(None),
        }
    }

    pub fn purchases_of(&self, buyer: &UserId) -> MarketResult<Vec<Purchase>> {
        let mut purchases = Vec::new();
        for entry in self.user_purchases.scan_prefix(buyer.as_bytes()) {
            let (key, _) = entry?;
            let Some(id) = key_suffix(&key) else { continue };
            if let Some(purchase) = self.purchase(&PurchaseId::from_bytes(id))? {
                purchases.push(purchase);
            }
        }
        Ok(purchases)
    }

    pub fn purchase_count(&self) -> usize {
        self.purchases.len()
    }

    // ----- trades -----

    pub fn trade(&self, id: &TradeId) -> MarketResult<Option<Trade>> {
        self.trades
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn require_trade(&self, id: &TradeId) -> MarketResult<Trade> {
        self.trade(id)?
            .ok_or_else(|| MarketError::NotFound(format!("trade {id}")))
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Trades the user takes part in, with the side they are on.
    pub fn trades_of(&self, user: &UserId) -> MarketResult<Vec<(Trade, Role)>> {
        let mut trades = Vec::new();
        for entry in self.user_trades.scan_prefix(user.as_bytes()) {
            let (key, role) = entry?;
            let Some(id) = key_suffix(&key) else { continue };
            if let Some(trade) = self.trade(&TradeId::from_bytes(id))? {
                trades.push((trade, decode(&role)?));
            }
        }
        Ok(trades)
    }

    /// Flip the completion flag. Returns the stored trade and whether this
    /// call performed the open to complete transition.
    pub fn mark_complete(&self, id: &TradeId, at: TimeStamp<Utc>) -> MarketResult<(Trade, bool)> {
        let mut failure = None;
        let previous = self.trades.fetch_and_update(id.as_bytes(), |old| {
            let old = old?;
            let updated = decode::<Trade>(old).and_then(|mut trade| {
                if !trade.is_complete {
                    trade.is_complete = true;
                    trade.completed_at = Some(at.clone());
                }
                encode(&trade)
            });
            match updated {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    failure = Some(e);
                    Some(old.to_vec())
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e);
        }

        let previous: Trade = match previous {
            Some(bytes) => decode(&bytes)?,
            None => return Err(MarketError::NotFound(format!("trade {id}"))),
        };
        let transitioned = !previous.is_complete;
        Ok((self.require_trade(id)?, transitioned))
    }

    // ----- ratings -----

    pub fn rating(&self, trade: &TradeId, rater: &UserId) -> MarketResult<Option<RatingEdge>> {
        self.ratings
            .get(compound_key(trade.as_bytes(), rater.as_bytes()))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Upsert: one edge per (trade, rater).
    pub fn put_rating(&self, edge: &RatingEdge) -> MarketResult<()> {
        let key = compound_key(edge.trade_id.as_bytes(), edge.rater.as_bytes());
        self.ratings.insert(key, encode(edge)?)?;
        Ok(())
    }

    pub fn trade_record(&self, trade: Trade) -> MarketResult<TradeRecord> {
        let buyer_rating = self.rating(&trade.id, &trade.buyer)?.map(|e| e.score);
        let seller_rating = self.rating(&trade.id, &trade.seller)?.map(|e| e.score);
        Ok(TradeRecord {
            trade,
            buyer_rating,
            seller_rating,
        })
    }

    // ----- messages -----

    /// All messages of a trade, oldest first.
    pub fn messages_for_trade(&self, trade: &TradeId) -> MarketResult<Vec<TradeMessage>> {
        let mut messages = self
            .messages
            .scan_prefix(trade.as_bytes())
            .values()
            .map(|bytes| decode::<TradeMessage>(&bytes?))
            .collect::<MarketResult<Vec<_>>>()?;
        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(messages)
    }

    pub fn message(&self, trade: &TradeId, id: &MessageId) -> MarketResult<Option<TradeMessage>> {
        self.messages
            .get(compound_key(trade.as_bytes(), id.as_bytes()))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn insert_message(&self, message: &TradeMessage) -> MarketResult<()> {
        let key = compound_key(message.trade_id.as_bytes(), message.id.as_bytes());
        self.messages.insert(key, encode(message)?)?;
        Ok(())
    }

    /// Atomically rewrite one message. Returns `None` if it no longer exists.
    pub fn update_message(
        &self,
        trade: &TradeId,
        id: &MessageId,
        apply: impl Fn(&mut TradeMessage),
    ) -> MarketResult<Option<TradeMessage>> {
        let key = compound_key(trade.as_bytes(), id.as_bytes());
        let mut failure = None;
        let updated = self.messages.update_and_fetch(key, |old| {
            let old = old?;
            let rewritten = decode::<TradeMessage>(old).and_then(|mut message| {
                apply(&mut message);
                encode(&message)
            });
            match rewritten {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    failure = Some(e);
                    Some(old.to_vec())
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e);
        }
        updated.map(|bytes| decode(&bytes)).transpose()
    }

    pub fn remove_message(
        &self,
        trade: &TradeId,
        id: &MessageId,
    ) -> MarketResult<Option<TradeMessage>> {
        self.messages
            .remove(compound_key(trade.as_bytes(), id.as_bytes()))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Mark every unread message of `trade` not written by `reader` as read.
    /// Returns how many flipped. Re-running is a no-op.
    pub fn mark_read(&self, trade: &TradeId, reader: &UserId) -> MarketResult<usize> {
        let unread: Vec<MessageId> = self
            .messages_for_trade(trade)?
            .into_iter()
            .filter(|m| m.author != *reader && !m.is_read)
            .map(|m| m.id)
            .collect();

        let mut flipped = 0;
        for id in unread {
            let updated = self.update_message(trade, &id, |message| {
                if message.author != *reader {
                    message.is_read = true;
                }
            })?;
            if updated.is_some() {
                flipped += 1;
            }
        }
        debug!(trade = %trade, reader = %reader, flipped, "marked messages read");
        Ok(flipped)
    }

    /// Unread messages of `trade` written by someone other than `reader`,
    /// plus the timestamp of the newest message.
    pub fn unread_summary(
        &self,
        trade: &TradeId,
        reader: &UserId,
    ) -> MarketResult<(usize, Option<TimeStamp<Utc>>)> {
        let mut unread = 0;
        let mut latest: Option<TimeStamp<Utc>> = None;
        for bytes in self.messages.scan_prefix(trade.as_bytes()).values() {
            let message: TradeMessage = decode(&bytes?)?;
            if message.author != *reader && !message.is_read {
                unread += 1;
            }
            if latest.as_ref().is_none_or(|l| message.created_at > *l) {
                latest = Some(message.created_at);
            }
        }
        Ok((unread, latest))
    }
}

pub(crate) fn into_market_error(
    err: sled::transaction::TransactionError<MarketError>,
) -> MarketError {
    match err {
        sled::transaction::TransactionError::Abort(e) => e,
        sled::transaction::TransactionError::Storage(e) => MarketError::Storage(e),
    }
}

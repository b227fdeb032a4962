//! Per-user dashboard projections
use std::cmp::Reverse;

use tracing::debug;

use super::error::MarketResult;
use super::service::MarketService;
use super::types::{ItemId, TradeId, UserId};

/// One row of a dashboard tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub item_id: ItemId,
    pub trade_id: Option<TradeId>,
    pub name: String,
    pub price: u64,
    pub is_sold: bool,
    /// Unread messages from the other party. Only set on trading rows.
    pub message_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Mean of received scores to one decimal, `0.0` when nothing was received.
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user: UserId,
    pub selling: Vec<ProfileEntry>,
    pub purchased: Vec<ProfileEntry>,
    pub trading: Vec<ProfileEntry>,
    pub total_unread: usize,
    pub average_rating: f64,
    pub rating_count: usize,
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl MarketService {
    pub fn dashboard(&self, actor: &UserId) -> MarketResult<Profile> {
        let mut selling = Vec::new();
        for item in self.store.items_of(actor)? {
            selling.push(ProfileEntry {
                is_sold: self.store.is_sold(&item.id)?,
                item_id: item.id,
                trade_id: None,
                name: item.name,
                price: item.price,
                message_count: 0,
            });
        }

        let mut purchased = Vec::new();
        for purchase in self.store.purchases_of(actor)? {
            let item = self.store.require_item(&purchase.item_id)?;
            purchased.push(ProfileEntry {
                item_id: item.id,
                trade_id: Some(purchase.trade_id),
                name: item.name,
                price: item.price,
                is_sold: true,
                message_count: 0,
            });
        }

        let mut trading = Vec::new();
        for (trade, _) in self.store.trades_of(actor)? {
            if trade.is_complete {
                continue;
            }
            let (unread, latest) = self.store.unread_summary(&trade.id, actor)?;
            let item = self.store.require_item(&trade.item_id)?;
            let last_activity = latest.unwrap_or_else(|| trade.created_at.clone());
            trading.push((
                last_activity,
                ProfileEntry {
                    item_id: item.id,
                    trade_id: Some(trade.id),
                    name: item.name,
                    price: item.price,
                    is_sold: true,
                    message_count: unread,
                },
            ));
        }
        trading.sort_by_key(|(last_activity, entry)| {
            (Reverse(last_activity.clone()), Reverse(entry.trade_id))
        });
        let trading: Vec<ProfileEntry> = trading.into_iter().map(|(_, entry)| entry).collect();
        let total_unread: usize = trading.iter().map(|entry| entry.message_count).sum();

        let ratings = self.rating_summary(actor)?;
        debug!(
            user = %actor,
            selling = selling.len(),
            purchased = purchased.len(),
            trading = trading.len(),
            total_unread,
            "dashboard built"
        );

        Ok(Profile {
            user: *actor,
            selling,
            purchased,
            trading,
            total_unread,
            average_rating: ratings.average,
            rating_count: ratings.count,
        })
    }

    /// Scores `actor` received from the other side of each of their trades,
    /// whichever side `actor` was on.
    pub fn rating_summary(&self, actor: &UserId) -> MarketResult<RatingSummary> {
        let mut total = 0u64;
        let mut count = 0usize;
        for (trade, _) in self.store.trades_of(actor)? {
            let Some(rater) = trade.counterparty(actor) else {
                continue;
            };
            if let Some(edge) = self.store.rating(&trade.id, &rater)? {
                total += u64::from(edge.score);
                count += 1;
            }
        }

        let average = if count == 0 {
            0.0
        } else {
            round_one_decimal(total as f64 / count as f64)
        };
        Ok(RatingSummary { average, count })
    }
}

//! Trade session: completion and mutual rating
use tracing::{info, warn};

use super::error::{MarketError, MarketResult};
use super::model::{RatingEdge, Role, Trade, TradeRecord, validate_score};
use super::service::MarketService;
use super::traits::TradeCompletedNotice;
use super::types::{TradeId, UserId};

const COMPLETED_SUBJECT: &str = "Trade completed";

impl MarketService {
    /// The trade with both parties' scores. Only the parties may look.
    pub fn trade(&self, actor: &UserId, trade_id: &TradeId) -> MarketResult<TradeRecord> {
        let (trade, _) = self.trade_for_party(actor, trade_id)?;
        self.store.trade_record(trade)
    }

    /// Buyer marks the trade complete. Repeating it is a no-op; the seller is
    /// notified once, on the transition.
    pub fn complete_trade(&self, actor: &UserId, trade_id: &TradeId) -> MarketResult<TradeRecord> {
        let trade = self.store.require_trade(trade_id)?;
        if trade.buyer != *actor {
            return Err(MarketError::Forbidden(format!(
                "only the buyer may complete trade {trade_id}"
            )));
        }
        if trade.is_complete {
            return self.store.trade_record(trade);
        }

        let (trade, transitioned) = self
            .store
            .mark_complete(trade_id, self.collaborators.clock.now())?;

        if transitioned {
            info!(trade = %trade.id, buyer = %trade.buyer, "trade completed");
            self.notify_completed(&trade);
        }
        self.store.trade_record(trade)
    }

    // Best effort; completion is already durable.
    fn notify_completed(&self, trade: &Trade) {
        let item_name = match self.store.item(&trade.item_id) {
            Ok(Some(item)) => item.name,
            _ => String::new(),
        };
        let notice = TradeCompletedNotice {
            recipient: trade.seller,
            buyer: trade.buyer,
            trade_id: trade.id,
            item_name,
            subject: COMPLETED_SUBJECT.to_string(),
            link: self.config.trade_thread_url(&trade.id),
        };
        if let Err(e) = self.collaborators.notifier.trade_completed(&notice) {
            warn!(trade = %trade.id, error = %e, "completion notice not sent");
        }
    }

    /// Record `actor`'s score for the other party. Buyer and seller each own
    /// one score per trade; submitting again replaces it.
    pub fn submit_rating(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
        score: i64,
    ) -> MarketResult<TradeRecord> {
        let score = validate_score(score)?;
        let (trade, role) = self.trade_for_party(actor, trade_id)?;

        let ratee = match role {
            Role::Buyer => trade.seller,
            Role::Seller => trade.buyer,
        };
        let edge = RatingEdge {
            trade_id: trade.id,
            rater: *actor,
            ratee,
            rater_role: role,
            score,
            rated_at: self.collaborators.clock.now(),
        };
        self.store.put_rating(&edge)?;

        info!(trade = %trade.id, rater = %actor, ratee = %ratee, score, "rating submitted");
        self.store.trade_record(trade)
    }
}

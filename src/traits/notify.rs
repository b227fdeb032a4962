//! Notification dispatch.

use tracing::info;

use crate::types::{TradeId, UserId};

/// Sent to the seller once the buyer marks a trade complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCompletedNotice {
    pub recipient: UserId,
    pub buyer: UserId,
    pub trade_id: TradeId,
    pub item_name: String,
    pub subject: String,
    pub link: String,
}

pub trait Notifier: Send + Sync {
    fn trade_completed(&self, notice: &TradeCompletedNotice) -> anyhow::Result<()>;
}

/// Emits notices as structured log events. Delivery is left to whatever
/// consumes the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn trade_completed(&self, notice: &TradeCompletedNotice) -> anyhow::Result<()> {
        info!(
            recipient = %notice.recipient,
            buyer = %notice.buyer,
            trade = %notice.trade_id,
            item = %notice.item_name,
            link = %notice.link,
            "{}",
            notice.subject
        );
        Ok(())
    }
}

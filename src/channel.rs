//! Trade message channel
//!
//! Messages are keyed by `trade ++ message` so one prefix scan returns a
//! whole thread. Read receipts are set by the counter-party opening the
//! thread, never by an explicit call.
use tracing::{debug, info, warn};

use super::config::MESSAGE_IMAGE_DIR;
use super::error::{MarketError, MarketResult};
use super::model::{ImageUpload, Role, TradeMessage, TradeRecord, validate_body};
use super::service::MarketService;
use super::types::{MessageId, TradeId, UserId};

/// What a party sees when opening a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeThread {
    pub trade: TradeRecord,
    pub item_name: String,
    pub partner: UserId,
    pub messages: Vec<TradeMessage>,
}

/// A finished trade still waiting for the viewer's score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvaluation {
    pub trade_id: TradeId,
    pub item_name: String,
}

impl MarketService {
    /// Open a thread. Everything the other party wrote becomes read.
    pub fn list_messages(&self, actor: &UserId, trade_id: &TradeId) -> MarketResult<TradeThread> {
        let (trade, role) = self.trade_for_party(actor, trade_id)?;
        self.store.mark_read(trade_id, actor)?;

        let partner = match role {
            Role::Buyer => trade.seller,
            Role::Seller => trade.buyer,
        };
        let item_name = self.store.require_item(&trade.item_id)?.name;
        let messages = self.store.messages_for_trade(trade_id)?;
        Ok(TradeThread {
            trade: self.store.trade_record(trade)?,
            item_name,
            partner,
            messages,
        })
    }

    pub fn post_message(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
        body: &str,
        image: Option<ImageUpload>,
    ) -> MarketResult<TradeMessage> {
        validate_body(body)?;
        let image = match image {
            Some(image) => Some((image.validate()?, image)),
            None => None,
        };
        self.trade_for_party(actor, trade_id)?;

        let image_path = match &image {
            Some((kind, image)) => {
                let path = self
                    .collaborators
                    .blobs
                    .store(MESSAGE_IMAGE_DIR, kind.extension(), &image.bytes)
                    .map_err(|e| MarketError::External(e.context("storing message image")))?;
                debug!(
                    trade = %trade_id,
                    upload = %image.file_name,
                    path = %path,
                    "message image stored"
                );
                Some(path)
            }
            None => None,
        };

        let message = TradeMessage {
            id: MessageId::new(),
            trade_id: *trade_id,
            author: *actor,
            body: body.to_string(),
            image_path,
            is_read: false,
            created_at: self.collaborators.clock.now(),
            edited_at: None,
        };
        if let Err(e) = self.store.insert_message(&message) {
            if let Some(path) = &message.image_path {
                self.discard_blob(path);
            }
            return Err(e);
        }

        debug!(trade = %trade_id, message = %message.id, author = %actor, "message posted");
        Ok(message)
    }

    /// Replace the body of one of `actor`'s own messages on an open trade.
    pub fn edit_message(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
        message_id: &MessageId,
        new_body: &str,
    ) -> MarketResult<TradeMessage> {
        validate_body(new_body)?;
        self.authorize_author(actor, trade_id, message_id)?;

        let edited_at = self.collaborators.clock.now();
        let message = self
            .store
            .update_message(trade_id, message_id, |message| {
                message.body = new_body.to_string();
                message.edited_at = Some(edited_at.clone());
            })?
            .ok_or_else(|| MarketError::NotFound(format!("message {message_id}")))?;

        debug!(trade = %trade_id, message = %message_id, "message edited");
        Ok(message)
    }

    /// Remove one of `actor`'s own messages from an open trade, along with
    /// its image.
    pub fn delete_message(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
        message_id: &MessageId,
    ) -> MarketResult<()> {
        self.authorize_author(actor, trade_id, message_id)?;

        let removed = self
            .store
            .remove_message(trade_id, message_id)?
            .ok_or_else(|| MarketError::NotFound(format!("message {message_id}")))?;
        if let Some(path) = &removed.image_path {
            self.discard_blob(path);
        }

        info!(trade = %trade_id, message = %message_id, author = %actor, "message deleted");
        Ok(())
    }

    /// Completed trades of `actor`, other than `except`, where `actor` has
    /// not rated the other party yet.
    pub fn list_pending_evaluations(
        &self,
        actor: &UserId,
        except: Option<&TradeId>,
    ) -> MarketResult<Vec<PendingEvaluation>> {
        let mut pending = Vec::new();
        for (trade, role) in self.store.trades_of(actor)? {
            if !trade.is_complete || Some(&trade.id) == except {
                continue;
            }
            let record = self.store.trade_record(trade)?;
            if record.rating_by(role).is_some() {
                continue;
            }
            let item_name = self.store.require_item(&record.trade.item_id)?.name;
            pending.push(PendingEvaluation {
                trade_id: record.trade.id,
                item_name,
            });
        }
        Ok(pending)
    }

    // Edit and delete share one rule: the author, while the trade is open.
    fn authorize_author(
        &self,
        actor: &UserId,
        trade_id: &TradeId,
        message_id: &MessageId,
    ) -> MarketResult<TradeMessage> {
        let trade = self.store.require_trade(trade_id)?;
        let message = self
            .store
            .message(trade_id, message_id)?
            .ok_or_else(|| MarketError::NotFound(format!("message {message_id}")))?;

        if message.author != *actor {
            return Err(MarketError::Forbidden(format!(
                "only the author may change message {message_id}"
            )));
        }
        if trade.is_complete {
            return Err(MarketError::Conflict(format!(
                "trade {trade_id} is complete; its messages are final"
            )));
        }
        Ok(message)
    }

    fn discard_blob(&self, path: &str) {
        if let Err(e) = self.collaborators.blobs.delete(path) {
            warn!(path, error = %e, "message image not removed");
        }
    }
}

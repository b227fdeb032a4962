//! Checkout session bridge.
//!
//! Opening a session only reads the ledger. The provider's success callback
//! comes back through [`MarketService::confirm_checkout`], which commits the
//! purchase through the normal ledger path.
use tracing::{info, warn};

use super::error::{MarketError, MarketResult, ValidationError};
use super::ledger::ensure_purchasable;
use super::model::{Purchase, PurchaseOrder};
use super::service::MarketService;
use super::traits::{CheckoutRequest, CheckoutSession};
use super::types::{ItemId, UserId};

/// Binds a provider session to one (item, buyer) pair.
pub fn client_reference(item: &ItemId, buyer: &UserId) -> String {
    format!("{item}:{buyer}")
}

impl MarketService {
    /// Ask the payment provider for a hosted checkout session for `order`.
    pub fn create_checkout_session(
        &self,
        buyer: &UserId,
        buyer_email: &str,
        order: &PurchaseOrder,
    ) -> MarketResult<CheckoutSession> {
        order.validate()?;
        if buyer_email.trim().is_empty() {
            return Err(ValidationError::Missing("buyer e-mail").into());
        }

        let item = ensure_purchasable(
            self.store.item(&order.item_id)?,
            buyer,
            self.store.is_sold(&order.item_id)?,
            &order.item_id,
        )?;

        let request = CheckoutRequest {
            item_name: item.name.clone(),
            unit_amount: item.price,
            currency: self.config.currency.clone(),
            quantity: 1,
            customer_email: buyer_email.to_string(),
            client_reference: client_reference(&item.id, buyer),
            success_url: self.config.checkout_success_url(&item.id),
            cancel_url: self.config.checkout_cancel_url(&item.id),
        };

        let session = self
            .collaborators
            .checkout
            .create_session(&request)
            .map_err(|e| {
                warn!(item = %item.id, buyer = %buyer, error = %e, "checkout session failed");
                MarketError::External(e.context("creating checkout session"))
            })?;

        info!(item = %item.id, buyer = %buyer, session = %session.id, "checkout session opened");
        Ok(session)
    }

    /// Success callback: commit the purchase once the provider reports the
    /// session as paid. A replayed callback for a sale this buyer already
    /// holds returns the existing purchase.
    pub fn confirm_checkout(
        &self,
        buyer: &UserId,
        session_id: &str,
        order: &PurchaseOrder,
    ) -> MarketResult<Purchase> {
        let status = self
            .collaborators
            .checkout
            .session_status(session_id)
            .map_err(|e| MarketError::External(e.context("reading checkout session")))?;

        if status.client_reference != client_reference(&order.item_id, buyer) {
            return Err(MarketError::Forbidden(format!(
                "checkout session {session_id} does not belong to this purchase"
            )));
        }
        if !status.paid {
            return Err(MarketError::Conflict(format!(
                "checkout session {session_id} has not been paid"
            )));
        }

        let reason = match self.commit_purchase(buyer, order) {
            Err(MarketError::Conflict(reason)) => reason,
            other => return other,
        };
        let existing = self.store.purchase_for_item(&order.item_id)?;
        match existing {
            Some(existing) if existing.buyer == *buyer => {
                info!(
                    purchase = %existing.id,
                    session = %session_id,
                    "checkout callback replayed"
                );
                Ok(existing)
            }
            _ => Err(MarketError::Conflict(reason)),
        }
    }
}

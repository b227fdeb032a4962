//! End to end scenarios across ledger, checkout, completion, rating and the
//! dashboard. Every test runs on its own temporary sled database.
mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Context;
use common::{Harness, order_for, shipping};
use flea_trade::{
    ErrorKind, MarketError, PaymentMethod, PurchaseOrder, ShippingSnapshot, UserId,
    ValidationError,
};

#[test]
fn concurrent_buyers_get_exactly_one_purchase() -> anyhow::Result<()> {
    const BUYERS: usize = 8;

    let h = Harness::new()?;
    let seller = UserId::new();
    let item = h.list(seller, "Wristwatch", 15_000)?;
    let barrier = Arc::new(Barrier::new(BUYERS));

    let handles: Vec<_> = (0..BUYERS)
        .map(|_| {
            let market = Arc::clone(&h.market);
            let barrier = Arc::clone(&barrier);
            let order = order_for(&item);
            thread::spawn(move || {
                let buyer = UserId::new();
                barrier.wait();
                market.commit_purchase(&buyer, &order)
            })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().expect("buyer thread panicked") {
            Ok(_) => wins += 1,
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::Conflict, "unexpected error: {e}");
                conflicts += 1;
            }
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(conflicts, BUYERS - 1);
    assert_eq!(h.market.store().purchase_count(), 1);
    assert_eq!(h.market.store().trade_count(), 1);
    assert!(h.market.is_sold(&item.id)?);
    Ok(())
}

#[test]
fn purchase_opens_a_trade_between_both_parties() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (seller, buyer, purchase) = h.sold_trade()?;

    let record = h.market.trade(&buyer, &purchase.trade_id)?;
    assert_eq!(record.trade.purchase_id, purchase.id);
    assert_eq!(record.trade.seller, seller);
    assert_eq!(record.trade.buyer, buyer);
    assert!(!record.trade.is_complete);
    assert_eq!(purchase.shipping, shipping());

    let stranger = UserId::new();
    let err = h.market.trade(&stranger, &purchase.trade_id).unwrap_err();
    assert_eq!(err.status_code(), 403);
    Ok(())
}

#[test]
fn purchase_rejections() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let seller = UserId::new();
    let item = h.list(seller, "Onion", 300)?;

    // own listing
    let err = h.market.commit_purchase(&seller, &order_for(&item)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    // unknown item
    let missing = PurchaseOrder::new(
        flea_trade::ItemId::new(),
        PaymentMethod::Card,
        shipping(),
    );
    let err = h.market.commit_purchase(&UserId::new(), &missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // malformed shipping never reaches the ledger
    let bad = PurchaseOrder::new(
        item.id,
        PaymentMethod::Card,
        ShippingSnapshot::new("1234567", "1-1 Chiyoda"),
    );
    let err = h.market.commit_purchase(&UserId::new(), &bad).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Validation(ValidationError::InvalidPostCode)
    ));

    assert_eq!(h.market.store().purchase_count(), 0);
    assert_eq!(h.market.store().trade_count(), 0);
    assert!(!h.market.is_sold(&item.id)?);

    // a second buyer after the sale
    h.market.commit_purchase(&UserId::new(), &order_for(&item))?;
    let err = h.market.commit_purchase(&UserId::new(), &order_for(&item)).unwrap_err();
    assert_eq!(err.status_code(), 409);
    Ok(())
}

#[test]
fn checkout_session_then_confirmation() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let seller = UserId::new();
    let buyer = UserId::new();
    let item = h.list(seller, "Leather shoes", 4_000)?;
    let order = order_for(&item);

    let session = h
        .market
        .create_checkout_session(&buyer, "buyer@example.com", &order)?;
    assert!(!h.market.is_sold(&item.id)?, "opening a session must not sell");
    let rival = UserId::new();
    let rival_session = h
        .market
        .create_checkout_session(&rival, "rival@example.com", &order)?;
    h.checkout.mark_paid(&rival_session.id);

    let request = h.checkout.request(&session.id).context("session recorded")?;
    assert_eq!(request.unit_amount, 4_000);
    assert_eq!(request.quantity, 1);
    assert_eq!(request.currency, "jpy");
    assert_eq!(request.customer_email, "buyer@example.com");
    assert_eq!(
        request.success_url,
        format!(
            "http://localhost:3000/purchase/{}/complete?session_id={{CHECKOUT_SESSION_ID}}",
            item.id
        )
    );
    assert_eq!(
        request.cancel_url,
        format!("http://localhost:3000/purchase/{}", item.id)
    );

    // unpaid callback
    let err = h
        .market
        .confirm_checkout(&buyer, &session.id, &order)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    h.checkout.mark_paid(&session.id);
    let purchase = h.market.confirm_checkout(&buyer, &session.id, &order)?;
    assert_eq!(purchase.buyer, buyer);

    // replayed callback returns the same sale
    let replay = h.market.confirm_checkout(&buyer, &session.id, &order)?;
    assert_eq!(replay.id, purchase.id);

    // a second paid session for the sold item is not a replay
    let err = h
        .market
        .confirm_checkout(&rival, &rival_session.id, &order)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.market.store().purchase_count(), 1);
    Ok(())
}

#[test]
fn checkout_session_bound_to_its_buyer() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let item = h.list(UserId::new(), "Coffee mill", 2_500)?;
    let buyer = UserId::new();
    let order = order_for(&item);

    let session = h
        .market
        .create_checkout_session(&buyer, "buyer@example.com", &order)?;
    h.checkout.mark_paid(&session.id);

    let thief = UserId::new();
    let err = h
        .market
        .confirm_checkout(&thief, &session.id, &order)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(!h.market.is_sold(&item.id)?);
    Ok(())
}

#[test]
fn unreachable_provider_leaves_ledger_untouched() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let item = h.list(UserId::new(), "HDD", 5_000)?;
    h.checkout.set_unreachable(true);

    let err = h
        .market
        .create_checkout_session(&UserId::new(), "buyer@example.com", &order_for(&item))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert_eq!(err.status_code(), 502);
    assert_eq!(h.market.store().purchase_count(), 0);
    assert_eq!(h.checkout.session_count(), 0);
    Ok(())
}

#[test]
fn checkout_rejected_before_provider_is_called() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let seller = UserId::new();
    let item = h.list(seller, "Mic", 8_000)?;

    let err = h
        .market
        .create_checkout_session(&seller, "seller@example.com", &order_for(&item))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = h
        .market
        .create_checkout_session(&UserId::new(), "  ", &order_for(&item))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.market.commit_purchase(&UserId::new(), &order_for(&item))?;
    let err = h
        .market
        .create_checkout_session(&UserId::new(), "late@example.com", &order_for(&item))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(h.checkout.session_count(), 0);
    Ok(())
}

#[test]
fn only_the_buyer_completes_and_only_once() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (seller, buyer, purchase) = h.sold_trade()?;
    let trade_id = purchase.trade_id;

    let err = h.market.complete_trade(&seller, &trade_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = h.market.complete_trade(&UserId::new(), &trade_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let first = h.market.complete_trade(&buyer, &trade_id)?;
    assert!(first.trade.is_complete);
    let completed_at = first.trade.completed_at.clone();
    assert!(completed_at.is_some());

    h.clock.advance_secs(60);
    let second = h.market.complete_trade(&buyer, &trade_id)?;
    assert!(second.trade.is_complete);
    assert_eq!(second.trade.completed_at, completed_at);

    // still rejected for the seller once complete
    let err = h.market.complete_trade(&seller, &trade_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, seller);
    assert_eq!(sent[0].buyer, buyer);
    assert_eq!(sent[0].item_name, "Wristwatch");
    assert_eq!(sent[0].subject, "Trade completed");
    assert_eq!(
        sent[0].link,
        format!("http://localhost:3000/trades/{trade_id}/messages")
    );
    Ok(())
}

#[test]
fn notifier_failure_does_not_undo_completion() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (_, buyer, purchase) = h.sold_trade()?;
    h.notifier.set_failing(true);

    let record = h.market.complete_trade(&buyer, &purchase.trade_id)?;
    assert!(record.trade.is_complete);
    assert!(h.notifier.sent().is_empty());
    assert!(
        h.market
            .store()
            .require_trade(&purchase.trade_id)?
            .is_complete
    );
    Ok(())
}

#[test]
fn completing_unknown_trade_is_not_found() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let err = h
        .market
        .complete_trade(&UserId::new(), &flea_trade::TradeId::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn complete_and_rate_each_other() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (seller, buyer, purchase) = h.sold_trade()?;
    let trade_id = purchase.trade_id;

    h.market.complete_trade(&buyer, &trade_id)?;
    h.market.submit_rating(&buyer, &trade_id, 5)?;
    let record = h.market.submit_rating(&seller, &trade_id, 4)?;

    assert_eq!(record.buyer_rating, Some(5));
    assert_eq!(record.seller_rating, Some(4));

    let seller_view = h.market.rating_summary(&seller)?;
    assert_eq!(seller_view.count, 1);
    assert_eq!(seller_view.average, 5.0);

    let buyer_view = h.market.rating_summary(&buyer)?;
    assert_eq!(buyer_view.count, 1);
    assert_eq!(buyer_view.average, 4.0);
    Ok(())
}

#[test]
fn rating_resubmission_overwrites() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (seller, buyer, purchase) = h.sold_trade()?;

    h.market.submit_rating(&buyer, &purchase.trade_id, 2)?;
    let record = h.market.submit_rating(&buyer, &purchase.trade_id, 5)?;
    assert_eq!(record.buyer_rating, Some(5));

    let summary = h.market.rating_summary(&seller)?;
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 5.0);
    Ok(())
}

#[test]
fn rating_rejections() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let (_, buyer, purchase) = h.sold_trade()?;

    for score in [0, 6, -1] {
        let err = h
            .market
            .submit_rating(&buyer, &purchase.trade_id, score)
            .unwrap_err();
        assert_eq!(err.status_code(), 422, "score {score}");
    }

    let err = h
        .market
        .submit_rating(&UserId::new(), &purchase.trade_id, 3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let record = h.market.trade(&buyer, &purchase.trade_id)?;
    assert_eq!(record.buyer_rating, None);
    assert_eq!(record.seller_rating, None);
    Ok(())
}

#[test]
fn rating_average_is_role_symmetric() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let user = UserId::new();

    // trade A: user sells, buyer rates 4
    let buyer_a = UserId::new();
    let item_a = h.list(user, "Camera", 30_000)?;
    let trade_a = h.market.commit_purchase(&buyer_a, &order_for(&item_a))?.trade_id;
    h.market.submit_rating(&buyer_a, &trade_a, 4)?;

    // trade B: user buys, seller rates 2
    let seller_b = UserId::new();
    let item_b = h.list(seller_b, "Tumbler", 500)?;
    let trade_b = h.market.commit_purchase(&user, &order_for(&item_b))?.trade_id;
    h.market.submit_rating(&seller_b, &trade_b, 2)?;

    // the user's own scores must not count towards what they received
    h.market.submit_rating(&user, &trade_a, 1)?;
    h.market.submit_rating(&user, &trade_b, 1)?;

    let profile = h.market.dashboard(&user)?;
    assert_eq!(profile.rating_count, 2);
    assert_eq!(profile.average_rating, 3.0);
    Ok(())
}

#[test]
fn dashboard_projections() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let user = UserId::new();

    let kept = h.list(user, "Bag", 3_500)?;
    let sold = h.list(user, "Shoes", 4_000)?;
    let partner = UserId::new();
    let sale = h.market.commit_purchase(&partner, &order_for(&sold))?;

    h.clock.advance_secs(10);
    let other_item = h.list(UserId::new(), "Laptop", 45_000)?;
    let bought = h.market.commit_purchase(&user, &order_for(&other_item))?;

    let profile = h.market.dashboard(&user)?;

    assert_eq!(profile.selling.len(), 2);
    let sold_flags: Vec<_> = profile
        .selling
        .iter()
        .map(|e| (e.item_id, e.is_sold))
        .collect();
    assert!(sold_flags.contains(&(kept.id, false)));
    assert!(sold_flags.contains(&(sold.id, true)));

    assert_eq!(profile.purchased.len(), 1);
    assert_eq!(profile.purchased[0].item_id, other_item.id);
    assert_eq!(profile.purchased[0].trade_id, Some(bought.trade_id));

    // newest trade first when neither has messages
    let trading: Vec<_> = profile.trading.iter().map(|e| e.trade_id).collect();
    assert_eq!(trading, vec![Some(bought.trade_id), Some(sale.trade_id)]);

    // a newer message lifts the older trade to the top
    h.clock.advance_secs(10);
    h.market
        .post_message(&partner, &sale.trade_id, "Is it still boxed?", None)?;
    let profile = h.market.dashboard(&user)?;
    let trading: Vec<_> = profile.trading.iter().map(|e| e.trade_id).collect();
    assert_eq!(trading, vec![Some(sale.trade_id), Some(bought.trade_id)]);
    assert_eq!(profile.trading[0].message_count, 1);
    assert_eq!(profile.total_unread, 1);

    // completed trades leave the trading tab
    h.market.complete_trade(&user, &bought.trade_id)?;
    let profile = h.market.dashboard(&user)?;
    assert_eq!(profile.trading.len(), 1);
    assert_eq!(profile.trading[0].trade_id, Some(sale.trade_id));
    Ok(())
}

#[test]
fn empty_dashboard() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let profile = h.market.dashboard(&UserId::new())?;

    assert!(profile.selling.is_empty());
    assert!(profile.purchased.is_empty());
    assert!(profile.trading.is_empty());
    assert_eq!(profile.total_unread, 0);
    assert_eq!(profile.rating_count, 0);
    assert_eq!(profile.average_rating, 0.0);
    Ok(())
}

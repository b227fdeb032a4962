//! Walks one listing through checkout, messaging, completion and rating
//! against a local sled database, then prints both parties' dashboards.
use std::sync::Arc;

use anyhow::Context;
use flea_trade::mocks::MockCheckout;
use flea_trade::{
    Collaborators, ImageUpload, MarketConfig, MarketService, PaymentMethod, Profile,
    PurchaseOrder, ShippingSnapshot, UserId,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_profile(label: &str, profile: &Profile) {
    println!("== {label} ({})", profile.user);
    for entry in &profile.selling {
        let state = if entry.is_sold { "sold" } else { "listed" };
        println!("  selling    {} {} yen [{state}]", entry.name, entry.price);
    }
    for entry in &profile.purchased {
        println!("  purchased  {} {} yen", entry.name, entry.price);
    }
    for entry in &profile.trading {
        println!("  trading    {} ({} unread)", entry.name, entry.message_count);
    }
    println!(
        "  unread {} | rating {:.1} from {} trade(s)",
        profile.total_unread, profile.average_rating, profile.rating_count
    );
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = MarketConfig::from_env();
    let db = sled::open(&config.data_dir)
        .with_context(|| format!("opening database at {}", config.data_dir.display()))?;
    let checkout = MockCheckout::new();
    let collaborators = Collaborators::with_checkout(&config, Arc::new(checkout.clone()));
    let market = MarketService::new(Arc::new(db), config, collaborators)?;

    let seller = UserId::new();
    let buyer = UserId::new();
    let item = market.list_item(seller, "Leather shoes", 4_000)?;
    market.list_item(seller, "Coffee mill", 2_500)?;

    let order = PurchaseOrder::new(
        item.id,
        PaymentMethod::Card,
        ShippingSnapshot::new("150-0001", "1-2-3 Jingumae, Shibuya").with_building("Room 401"),
    );
    let session = market.create_checkout_session(&buyer, "buyer@example.com", &order)?;
    println!("checkout session {} -> {:?}", session.id, session.url);
    checkout.mark_paid(&session.id);
    let purchase = market.confirm_checkout(&buyer, &session.id, &order)?;
    let trade_id = purchase.trade_id;

    market.post_message(&buyer, &trade_id, "Hello, when can you ship?", None)?;
    let photo = ImageUpload::new("box.png", b"\x89PNG\r\n\x1a\n".to_vec());
    market.post_message(&seller, &trade_id, "Packed and ready.", Some(photo))?;
    market.post_message(&seller, &trade_id, "Shipping tomorrow.", None)?;

    print_profile("buyer before reading", &market.dashboard(&buyer)?);
    let thread = market.list_messages(&buyer, &trade_id)?;
    println!("thread with {} has {} message(s)", thread.partner, thread.messages.len());

    market.complete_trade(&buyer, &trade_id)?;
    market.submit_rating(&buyer, &trade_id, 5)?;
    market.submit_rating(&seller, &trade_id, 4)?;

    print_profile("buyer", &market.dashboard(&buyer)?);
    print_profile("seller", &market.dashboard(&seller)?);

    market.store().flush()?;
    Ok(())
}

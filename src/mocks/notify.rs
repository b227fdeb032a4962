//! Mock notifier that records every notice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{Notifier, TradeCompletedNotice};

#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<TradeCompletedNotice>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<TradeCompletedNotice> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Notifier for MockNotifier {
    fn trade_completed(&self, notice: &TradeCompletedNotice) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mail relay unavailable");
        }
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("notifier lock poisoned"))?
            .push(notice.clone());
        Ok(())
    }
}

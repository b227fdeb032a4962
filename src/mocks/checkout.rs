//! Mock checkout provider. Sessions start unpaid; tests mark them paid.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{CheckoutProvider, CheckoutRequest, CheckoutSession, SessionStatus};

#[derive(Debug, Clone, Default)]
pub struct MockCheckout {
    sessions: Arc<Mutex<HashMap<String, (CheckoutRequest, bool)>>>,
    counter: Arc<AtomicU64>,
    unreachable: Arc<AtomicBool>,
}

impl MockCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the provider being down.
    pub fn set_unreachable(&self, down: bool) {
        self.unreachable.store(down, Ordering::SeqCst);
    }

    /// Simulate the buyer finishing payment on the hosted page.
    pub fn mark_paid(&self, session_id: &str) -> bool {
        let Ok(mut sessions) = self.sessions.lock() else {
            return false;
        };
        match sessions.get_mut(session_id) {
            Some((_, paid)) => {
                *paid = true;
                true
            }
            None => false,
        }
    }

    pub fn request(&self, session_id: &str) -> Option<CheckoutRequest> {
        self.sessions
            .lock()
            .ok()?
            .get(session_id)
            .map(|(request, _)| request.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn ensure_reachable(&self) -> anyhow::Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            anyhow::bail!("checkout provider unreachable");
        }
        Ok(())
    }
}

impl CheckoutProvider for MockCheckout {
    fn create_session(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        self.ensure_reachable()?;
        let id = format!("cs_test_{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("checkout lock poisoned"))?
            .insert(id.clone(), (request.clone(), false));

        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
        })
    }

    fn session_status(&self, session_id: &str) -> anyhow::Result<SessionStatus> {
        self.ensure_reachable()?;
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("checkout lock poisoned"))?;
        let (request, paid) = sessions
            .get(session_id)
            .ok_or_else(|| anyhow::anyhow!("no such checkout session {session_id}"))?;

        Ok(SessionStatus {
            paid: *paid,
            client_reference: request.client_reference.clone(),
        })
    }
}

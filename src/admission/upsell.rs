//! Upsell Signal
//!
//! Edge-triggered flag raised when native impressions cross the configured
//! threshold and cleared only by an explicit acknowledgment. Published over
//! a `watch` channel so UI code can observe it without polling.

use tokio::sync::watch;

pub struct UpsellSignal {
    tx: watch::Sender<bool>,
}

impl UpsellSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Publish the current flag value. Subscribers are only woken on change.
    pub fn publish(&self, pending: bool) {
        self.tx.send_if_modified(|current| {
            if *current == pending {
                false
            } else {
                *current = pending;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for UpsellSignal {
    fn default() -> Self {
        Self::new()
    }
}

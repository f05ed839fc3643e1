//! Auth-change fan-out.
//!
//! Every session client built from the same `AppState` publishes into one
//! broadcast channel. A view subscribes for as long as it is mounted; the
//! returned [`Subscription`] releases its receiver when dropped or when
//! [`Subscription::unsubscribe`] is called.

use tokio::sync::broadcast;

use super::types::AuthChange;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `change` to every live subscriber. Returns how many received it.
    pub fn emit(&self, change: AuthChange) -> usize {
        tracing::debug!(event = %change.event, user_id = %change.user_id, "auth change");
        self.tx.send(change).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe() }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Handle for one listener. Not `Clone`: one mounted view, one handle.
pub struct Subscription {
    rx: broadcast::Receiver<AuthChange>,
}

impl Subscription {
    /// Next change, or `None` once the hub is gone. A listener that fell
    /// behind skips the changes it missed.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

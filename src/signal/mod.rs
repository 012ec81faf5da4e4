//! One-shot change notification primitives.
//!
//! Every published configuration generation is paired with a
//! [`ChangeToken`]. The token starts out unfired and transitions to fired
//! exactly once, when that generation is superseded. Observers either poll
//! [`ChangeToken::has_changed`] or await [`ChangeToken::changed`].

use std::sync::Arc;

use tokio::sync::watch;

/// A single-shot change signal tied to one configuration generation.
///
/// Clones share state: firing any clone fires them all. Firing is
/// idempotent; the observable value transitions `false` → `true` at most
/// once.
#[derive(Debug, Clone)]
pub struct ChangeToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ChangeToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Non-blocking read of the fired flag.
    pub fn has_changed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the token has fired. Returns immediately when the
    /// token fired before the call.
    pub async fn changed(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Transitions the token to fired. Later calls are no-ops.
    pub fn fire(&self) {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
    }
}

impl Default for ChangeToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unfired() {
        let token = ChangeToken::new();
        assert!(!token.has_changed());
    }

    #[test]
    fn fires_exactly_once() {
        let token = ChangeToken::new();
        token.fire();
        assert!(token.has_changed());

        token.fire();
        assert!(token.has_changed());
    }

    #[test]
    fn clones_share_state() {
        let token = ChangeToken::new();
        let clone = token.clone();
        token.fire();
        assert!(clone.has_changed());
    }

    #[tokio::test]
    async fn changed_completes_after_fire() {
        let token = ChangeToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.changed().await;
        });
        token.fire();
        handle.await.expect("waiter task completes");
    }

    #[tokio::test]
    async fn changed_returns_immediately_when_already_fired() {
        let token = ChangeToken::new();
        token.fire();
        token.changed().await;
    }
}

//! Single-slot, fire-and-forget notification of IP changes.
//!
//! Exactly one handler may be installed; installing another replaces it.
//! Publishing spawns the handler on a detached tokio task and returns at once,
//! so the publisher never waits on, observes, or cancels the handler. Events
//! published while no handler is installed are dropped.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::types::UserIpChanged;

#[async_trait]
pub trait IpChangeHandler: Send + Sync {
    /// Errors are the handler's own business; nothing is reported back.
    async fn handle(&self, event: UserIpChanged);
}

pub trait IpChangePublisher: Send + Sync {
    /// Never blocks and never fails.
    fn publish(&self, event: UserIpChanged);
}

#[derive(Default)]
pub struct IpChangeNotifier {
    handler: RwLock<Option<Arc<dyn IpChangeHandler>>>,
}

impl IpChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing any previous one.
    pub fn set_handler(&self, handler: Arc<dyn IpChangeHandler>) {
        let mut slot = self.handler.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            info!("replacing registered ip change handler");
        }
        *slot = Some(handler);
    }

    fn current(&self) -> Option<Arc<dyn IpChangeHandler>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IpChangePublisher for IpChangeNotifier {
    fn publish(&self, event: UserIpChanged) {
        let Some(handler) = self.current() else {
            debug!(user_id = %event.user_id, "no ip change handler registered, event dropped");
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                // Detached: the JoinHandle is dropped on purpose.
                runtime.spawn(async move {
                    handler.handle(event).await;
                });
            }
            Err(_) => {
                warn!(user_id = %event.user_id, "no async runtime, ip change event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::UserId;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct Forward(mpsc::UnboundedSender<(&'static str, UserIpChanged)>, &'static str);

    #[async_trait]
    impl IpChangeHandler for Forward {
        async fn handle(&self, event: UserIpChanged) {
            let _ = self.0.send((self.1, event));
        }
    }

    struct Slow;

    #[async_trait]
    impl IpChangeHandler for Slow {
        async fn handle(&self, _event: UserIpChanged) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    struct Panics;

    #[async_trait]
    impl IpChangeHandler for Panics {
        async fn handle(&self, _event: UserIpChanged) {
            panic!("handler failure");
        }
    }

    fn event() -> UserIpChanged {
        UserIpChanged {
            user_id: UserId::new("user-a"),
            old_ip: "1.2.3.4".into(),
            new_ip: "5.6.7.8".into(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_handler() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = IpChangeNotifier::new();
        notifier.set_handler(Arc::new(Forward(tx, "first")));

        notifier.publish(event());

        let received = timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(received.ok().flatten(), Some(("first", event())));
    }

    #[tokio::test]
    async fn second_registration_replaces_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = IpChangeNotifier::new();
        notifier.set_handler(Arc::new(Forward(tx.clone(), "first")));
        notifier.set_handler(Arc::new(Forward(tx, "second")));

        notifier.publish(event());

        let received = timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(received.ok().flatten().map(|(tag, _)| tag), Some("second"));
    }

    #[tokio::test]
    async fn publish_without_handler_is_a_noop() {
        IpChangeNotifier::new().publish(event());
    }

    #[tokio::test]
    async fn publish_does_not_wait_for_handler() {
        let notifier = IpChangeNotifier::new();
        notifier.set_handler(Arc::new(Slow));
        let published = timeout(Duration::from_millis(500), async {
            notifier.publish(event());
        })
        .await;
        assert!(published.is_ok());
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = IpChangeNotifier::new();
        notifier.set_handler(Arc::new(Panics));
        notifier.publish(event());

        notifier.set_handler(Arc::new(Forward(tx, "after")));
        notifier.publish(event());
        let received = timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(received.ok().flatten().map(|(tag, _)| tag), Some("after"));
    }

    #[test]
    fn publish_outside_runtime_is_dropped() {
        let notifier = IpChangeNotifier::new();
        notifier.set_handler(Arc::new(Slow));
        notifier.publish(event());
    }
}

//! Notification queue for terminal refresh events.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::{broadcast, Mutex};

use crate::error::Result;
use crate::models::refresh::RefreshNotification;

/// At-least-once channel signalling completed refreshes.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, notification: RefreshNotification) -> Result<()>;

    /// Notifications enqueued and not yet consumed
    async fn get_all(&self) -> Result<Vec<RefreshNotification>>;

    /// Consume every pending notification, oldest first
    async fn drain(&self) -> Result<Vec<RefreshNotification>>;
}

/// Broadcast-based event bus holding notifications until drained.
///
/// Live subscribers receive each notification via `tokio::sync::broadcast`.
/// If a subscriber falls behind, it receives `RecvError::Lagged`; the pending
/// queue still holds every notification until a consumer drains it.
pub struct EventBus {
    tx: broadcast::Sender<RefreshNotification>,
    pending: Mutex<VecDeque<RefreshNotification>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshNotification> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl NotificationQueue for EventBus {
    async fn enqueue(&self, notification: RefreshNotification) -> Result<()> {
        self.pending.lock().await.push_back(notification.clone());
        // No subscribers is fine: the pending queue keeps the notification.
        let _ = self.tx.send(notification);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<RefreshNotification>> {
        Ok(self.pending.lock().await.iter().cloned().collect())
    }

    async fn drain(&self) -> Result<Vec<RefreshNotification>> {
        Ok(self.pending.lock().await.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coordinate::Coordinate;
    use crate::models::refresh::{RefreshEvent, RefreshOutcome};

    fn notification(version: &str) -> RefreshNotification {
        let event = RefreshEvent::new("PROD-1", &Coordinate::new("org.finos", "model"), version);
        RefreshNotification::completed(&event, RefreshOutcome::new())
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.enqueue(notification("1.0.0")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.version_id, "1.0.0");
        assert_eq!(received.project_id, "PROD-1");
    }

    #[tokio::test]
    async fn no_subscribers_keeps_pending() {
        let bus = EventBus::new(16);
        bus.enqueue(notification("1.0.0")).await.unwrap();
        bus.enqueue(notification("2.0.0")).await.unwrap();

        assert_eq!(bus.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn drain_consumes_in_order() {
        let bus = EventBus::new(16);
        bus.enqueue(notification("1.0.0")).await.unwrap();
        bus.enqueue(notification("2.0.0")).await.unwrap();

        let drained = bus.drain().await.unwrap();
        let versions: Vec<_> = drained.iter().map(|n| n.version_id.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "2.0.0"]);
        assert!(bus.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lagged_subscriber_still_drains() {
        let bus = EventBus::new(2); // tiny buffer
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.enqueue(notification(&format!("1.{}.0", i))).await.unwrap();
        }

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(_)) => {} // expected
            other => panic!("Expected Lagged, got {:?}", other),
        }
        assert_eq!(bus.drain().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn notification_serializes_camel_case() {
        let json = serde_json::to_string(&notification("1.0.0")).unwrap();
        assert!(json.contains(r#""versionId":"1.0.0""#));
        assert!(json.contains(r#""status":"SUCCESS""#));
    }
}

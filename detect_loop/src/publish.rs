//! Latest-detections bus.
//!
use common::Detection;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// The Current Detection Set as a watch channel.
///
/// Each cycle replaces the set wholesale; subscribers only ever observe
/// the latest value, late subscribers included. No history is kept.
pub struct DetectionBus {
    tx: watch::Sender<Vec<Detection>>,
}

impl DetectionBus {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { tx }
    }

    /// Replace the current set.
    pub fn publish(&self, detections: Vec<Detection>) {
        // send_replace keeps working with zero subscribers.
        self.tx.send_replace(detections);
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> Vec<Detection> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Detection>> {
        self.tx.subscribe()
    }

    /// The set as an async stream of replacements.
    pub fn stream(&self) -> WatchStream<Vec<Detection>> {
        WatchStream::new(self.tx.subscribe())
    }
}

impl Default for DetectionBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use common::BoundingBox;
    use tokio_stream::StreamExt;

    use super::*;

    fn set(label: &str) -> Vec<Detection> {
        vec![Detection::new(
            label,
            0.9,
            BoundingBox::new(0.0, 0.0, 0.5, 0.5),
        )]
    }

    #[test]
    fn starts_empty() {
        let bus = DetectionBus::new();
        assert!(bus.current().is_empty());
    }

    #[test]
    fn publish_replaces_wholesale() {
        let bus = DetectionBus::new();
        bus.publish(set("person"));
        bus.publish(set("dog"));

        let current = bus.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].label, "dog");
    }

    #[tokio::test]
    async fn late_subscriber_sees_latest_set() {
        let bus = DetectionBus::new();
        bus.publish(set("person"));

        let mut stream = bus.stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first[0].label, "person");
    }
}

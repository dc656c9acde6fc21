use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::messages::PresenceEvent;
use crate::presence::Presence;

/// Receives presence transitions. Trackers never call a listener while
/// holding their own lock, so implementations may query presence.
pub trait PresenceListener: Send + Sync {
    fn on_awake(&self, device: &str);
    fn on_sleeping(&self, device: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans every notification out to a changeable set of listeners.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Arc<dyn PresenceListener>)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn PresenceListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Listeners may add or remove listeners from their callback.
    fn snapshot(&self) -> Vec<Arc<dyn PresenceListener>> {
        self.entries
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

impl PresenceListener for Listeners {
    fn on_awake(&self, device: &str) {
        for listener in self.snapshot() {
            listener.on_awake(device);
        }
    }

    fn on_sleeping(&self, device: &str) {
        for listener in self.snapshot() {
            listener.on_sleeping(device);
        }
    }
}

/// Logs each transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl PresenceListener for LogListener {
    fn on_awake(&self, device: &str) {
        info!("Device {} is awake", device);
    }

    fn on_sleeping(&self, device: &str) {
        info!("Device {} is sleeping", device);
    }
}

/// Publishes transitions on a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastListener {
    tx: broadcast::Sender<PresenceEvent>,
}

impl BroadcastListener {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PresenceEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (BroadcastListener { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, device: &str, presence: Presence) {
        let event = PresenceEvent {
            device: device.to_string(),
            presence,
        };
        if let Err(err) = self.tx.send(event) {
            debug!("No subscribers for presence event: {:?}", err.0);
        }
    }
}

impl PresenceListener for BroadcastListener {
    fn on_awake(&self, device: &str) {
        self.publish(device, Presence::Awake);
    }

    fn on_sleeping(&self, device: &str) {
        self.publish(device, Presence::Sleeping);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::PresenceListener;
    use crate::presence::Presence;

    /// Keeps every notification it receives, in order.
    #[derive(Default)]
    pub struct RecordingListener {
        events: Mutex<Vec<(String, Presence)>>,
    }

    impl RecordingListener {
        pub fn events(&self) -> Vec<(String, Presence)> {
            self.events.lock().clone()
        }

        pub fn count(&self, presence: Presence) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|(_, p)| *p == presence)
                .count()
        }
    }

    impl PresenceListener for RecordingListener {
        fn on_awake(&self, device: &str) {
            self.events.lock().push((device.to_string(), Presence::Awake));
        }

        fn on_sleeping(&self, device: &str) {
            self.events
                .lock()
                .push((device.to_string(), Presence::Sleeping));
        }
    }
}

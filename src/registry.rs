use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{PresenceError, Result};
use crate::listener::Listeners;
use crate::presence::{Presence, PresenceTracker, validate_awake_time};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub device: String,
    pub presence: Presence,
    pub awake_time_ms: u64,
}

/// Creates a tracker when a device registers and disposes it when the
/// device goes away.
///
/// The map lock is only held to look a tracker up, so transitions on
/// different devices never wait on each other.
pub struct PresenceService<S: Scheduler> {
    scheduler: Arc<S>,
    listeners: Arc<Listeners>,
    default_awake_time: Duration,
    trackers: RwLock<HashMap<String, PresenceTracker<S>>>,
}

impl<S: Scheduler> PresenceService<S> {
    pub fn new(scheduler: Arc<S>, default_awake_time: Duration) -> Result<Self> {
        Ok(PresenceService {
            scheduler,
            listeners: Arc::new(Listeners::new()),
            default_awake_time: validate_awake_time(default_awake_time)?,
            trackers: RwLock::new(HashMap::new()),
        })
    }

    /// Every tracker created by this service notifies these listeners.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn default_awake_time(&self) -> Duration {
        self.default_awake_time
    }

    /// Starts tracking `device`, sleeping. A device that was already
    /// registered gets a fresh tracker and the old one is disposed.
    pub fn register(
        &self,
        device: &str,
        awake_time: Option<Duration>,
    ) -> Result<PresenceTracker<S>> {
        let awake_time = awake_time.unwrap_or(self.default_awake_time);
        let tracker = PresenceTracker::new(
            device,
            awake_time,
            self.scheduler.clone(),
            self.listeners.clone(),
        )?;

        let previous = self
            .trackers
            .write()
            .insert(device.to_string(), tracker.clone());
        if let Some(previous) = previous {
            debug!("Replacing presence tracker for device {}", device);
            previous.dispose();
        }

        info!(
            "Tracking presence of device {} (awake time {:?})",
            device, awake_time
        );
        Ok(tracker)
    }

    /// Returns `false` if the device was not registered.
    pub fn deregister(&self, device: &str) -> bool {
        let removed = self.trackers.write().remove(device);
        match removed {
            Some(tracker) => {
                tracker.dispose();
                true
            }
            None => false,
        }
    }

    pub fn tracker(&self, device: &str) -> Option<PresenceTracker<S>> {
        self.trackers.read().get(device).cloned()
    }

    pub fn mark_awake(&self, device: &str) -> bool {
        self.with_tracker(device, PresenceTracker::mark_awake)
    }

    pub fn mark_sleeping(&self, device: &str) -> bool {
        self.with_tracker(device, PresenceTracker::mark_sleeping)
    }

    pub fn is_awake(&self, device: &str) -> Option<bool> {
        self.tracker(device).map(|tracker| tracker.is_awake())
    }

    pub fn awake_time(&self, device: &str) -> Option<Duration> {
        self.tracker(device).map(|tracker| tracker.awake_duration())
    }

    pub fn set_awake_time(&self, device: &str, awake_time: Duration) -> Result<()> {
        self.tracker(device)
            .ok_or_else(|| PresenceError::UnknownDevice(device.to_string()))?
            .set_awake_duration(awake_time)
    }

    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Status of every registered device, sorted by name.
    pub fn snapshot(&self) -> Vec<DeviceStatus> {
        let mut statuses: Vec<DeviceStatus> = self
            .all_trackers()
            .into_iter()
            .map(|tracker| DeviceStatus {
                device: tracker.device().to_string(),
                presence: tracker.presence(),
                awake_time_ms: u64::try_from(tracker.awake_duration().as_millis())
                    .unwrap_or(u64::MAX),
            })
            .collect();
        statuses.sort_by(|a, b| a.device.cmp(&b.device));
        statuses
    }

    /// Disposes every tracker.
    pub fn shutdown(&self) {
        let trackers: Vec<_> = self.trackers.write().drain().map(|(_, t)| t).collect();
        info!("Stopping presence tracking for {} devices", trackers.len());
        for tracker in trackers {
            tracker.dispose();
        }
    }

    fn all_trackers(&self) -> Vec<PresenceTracker<S>> {
        self.trackers.read().values().cloned().collect()
    }

    fn with_tracker(&self, device: &str, f: impl FnOnce(&PresenceTracker<S>)) -> bool {
        match self.tracker(device) {
            Some(tracker) => {
                f(&tracker);
                true
            }
            None => {
                debug!("No presence tracker for device {}", device);
                false
            }
        }
    }
}

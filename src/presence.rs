//! Queue-mode presence of a single device.
//!
//! A device in queue mode is only reachable for a while after it talks to
//! us. Every activity signal marks it awake and (re)arms one timer; when that
//! timer runs out the device is presumed asleep again.
//!
//! The record (`presence` + pending timer) lives behind one mutex per device,
//! so replacing the timer and flipping the state happen as a single step.
//! Listeners are always notified after the lock is released.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{PresenceError, Result};
use crate::listener::PresenceListener;
use crate::scheduler::{Scheduler, SleepTask};

/// CoAP default: how long a device stays reachable after its last message.
pub const DEFAULT_AWAKE_TIME: Duration = Duration::from_millis(93_000);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Awake,
    #[default]
    Sleeping,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Awake => f.write_str("awake"),
            Presence::Sleeping => f.write_str("sleeping"),
        }
    }
}

pub fn validate_awake_time(awake_time: Duration) -> Result<Duration> {
    if awake_time.is_zero() {
        return Err(PresenceError::InvalidConfiguration(
            "awake time must be positive".to_string(),
        ));
    }
    Ok(awake_time)
}

struct PendingSleep<H> {
    handle: H,
    generation: u64,
}

struct Record<H> {
    presence: Presence,
    awake_time: Duration,
    /// Only `Some` while awake.
    pending: Option<PendingSleep<H>>,
    /// Stamp of the most recently scheduled sleep task.
    generation: u64,
    disposed: bool,
}

struct Shared<S: Scheduler> {
    device: String,
    scheduler: Arc<S>,
    listener: Arc<dyn PresenceListener>,
    record: Mutex<Record<S::Handle>>,
}

impl<S: Scheduler> Shared<S> {
    /// Moves the record to sleeping. `expired` carries the stamp of a sleep
    /// task that just fired; explicit calls pass `None`.
    fn fall_asleep(&self, expired: Option<u64>) {
        {
            let mut record = self.record.lock();
            if record.disposed {
                debug!("Ignoring sleep for disposed device {}", self.device);
                return;
            }
            if record.presence == Presence::Sleeping {
                return;
            }

            match expired {
                Some(generation) => {
                    let current = record.pending.as_ref().map(|p| p.generation);
                    if current != Some(generation) {
                        debug!(
                            "Stale sleep task {} for device {} (current {:?})",
                            generation, self.device, current
                        );
                        return;
                    }
                    // Already ran, nothing to cancel
                    record.pending = None;
                }
                None => {
                    if let Some(pending) = record.pending.take() {
                        self.scheduler.cancel(pending.handle);
                    }
                }
            }
            record.presence = Presence::Sleeping;
        }

        self.listener.on_sleeping(&self.device);
    }
}

impl<S: Scheduler> Drop for Shared<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.record.get_mut().pending.take() {
            self.scheduler.cancel(pending.handle);
        }
    }
}

fn sleep_task<S: Scheduler>(shared: Weak<Shared<S>>, generation: u64) -> SleepTask {
    Box::new(move || {
        if let Some(shared) = shared.upgrade() {
            shared.fall_asleep(Some(generation));
        }
    })
}

/// Presence of one device plus the timer that puts it back to sleep.
///
/// Clones share the same record. Dropping the last clone disposes it.
pub struct PresenceTracker<S: Scheduler> {
    shared: Arc<Shared<S>>,
}

impl<S: Scheduler> Clone for PresenceTracker<S> {
    fn clone(&self) -> Self {
        PresenceTracker {
            shared: self.shared.clone(),
        }
    }
}

impl<S: Scheduler> PresenceTracker<S> {
    /// Creates a sleeping tracker. Fails if `awake_time` is zero.
    pub fn new(
        device: impl Into<String>,
        awake_time: Duration,
        scheduler: Arc<S>,
        listener: Arc<dyn PresenceListener>,
    ) -> Result<Self> {
        let awake_time = validate_awake_time(awake_time)?;
        Ok(PresenceTracker {
            shared: Arc::new(Shared {
                device: device.into(),
                scheduler,
                listener,
                record: Mutex::new(Record {
                    presence: Presence::Sleeping,
                    awake_time,
                    pending: None,
                    generation: 0,
                    disposed: false,
                }),
            }),
        })
    }

    pub fn device(&self) -> &str {
        &self.shared.device
    }

    /// Records activity from the device.
    ///
    /// Always re-arms the sleep timer, even when the device was already
    /// awake. Listeners only hear about the sleeping -> awake edge.
    pub fn mark_awake(&self) {
        let woke = {
            let mut record = self.shared.record.lock();
            if record.disposed {
                debug!("Ignoring activity for disposed device {}", self.device());
                return;
            }

            if let Some(pending) = record.pending.take() {
                self.shared.scheduler.cancel(pending.handle);
            }
            record.generation += 1;
            let generation = record.generation;
            let handle = self.shared.scheduler.schedule(
                record.awake_time,
                sleep_task(Arc::downgrade(&self.shared), generation),
            );
            record.pending = Some(PendingSleep { handle, generation });

            let woke = record.presence == Presence::Sleeping;
            record.presence = Presence::Awake;
            woke
        };

        if woke {
            self.shared.listener.on_awake(self.device());
        }
    }

    /// Puts the device to sleep now and drops its timer. No-op if it is
    /// already sleeping.
    pub fn mark_sleeping(&self) {
        self.shared.fall_asleep(None);
    }

    pub fn is_awake(&self) -> bool {
        self.presence() == Presence::Awake
    }

    pub fn presence(&self) -> Presence {
        self.shared.record.lock().presence
    }

    pub fn awake_duration(&self) -> Duration {
        self.shared.record.lock().awake_time
    }

    /// Applies from the next activity signal on; a running timer keeps its
    /// original deadline.
    pub fn set_awake_duration(&self, awake_time: Duration) -> Result<()> {
        let awake_time = validate_awake_time(awake_time)?;
        let mut record = self.shared.record.lock();
        if !record.disposed {
            record.awake_time = awake_time;
        }
        Ok(())
    }

    pub fn has_pending_sleep(&self) -> bool {
        self.shared.record.lock().pending.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.record.lock().disposed
    }

    /// Cancels the pending timer and freezes the record. Safe to call more
    /// than once, from any state.
    pub fn dispose(&self) {
        let mut record = self.shared.record.lock();
        if record.disposed {
            return;
        }
        record.disposed = true;
        if let Some(pending) = record.pending.take() {
            self.shared.scheduler.cancel(pending.handle);
        }
        info!("Stopped tracking presence of device {}", self.device());
    }
}

impl<S: Scheduler> fmt::Debug for PresenceTracker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.shared.record.lock();
        f.debug_struct("PresenceTracker")
            .field("device", &self.shared.device)
            .field("presence", &record.presence)
            .field("awake_time", &record.awake_time)
            .field("generation", &record.generation)
            .field("disposed", &record.disposed)
            .finish()
    }
}

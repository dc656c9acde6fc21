//! Presence tracking for devices running in queue mode.
//!
//! A [`PresenceTracker`] follows one device between awake and sleeping,
//! re-arming a sleep timer on every activity signal. [`PresenceService`]
//! owns one tracker per registered device.

pub mod config;
pub mod error;
pub mod listener;
pub mod messages;
pub mod presence;
pub mod registry;
pub mod scheduler;

pub use error::{PresenceError, Result};
pub use listener::{BroadcastListener, Listeners, LogListener, PresenceListener};
pub use presence::{DEFAULT_AWAKE_TIME, Presence, PresenceTracker};
pub use registry::{DeviceStatus, PresenceService};
pub use scheduler::{Scheduler, SleepTask, TokioScheduler};

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Callback run once when a scheduled delay elapses.
pub type SleepTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs callbacks after a delay and hands back a cancellable handle.
///
/// `schedule` must not run the task on the calling thread: trackers call it
/// while holding their record lock.
pub trait Scheduler: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn schedule(&self, delay: Duration, task: SleepTask) -> Self::Handle;

    /// Best effort. Cancelling a handle whose task already ran (or was already
    /// cancelled) is a no-op.
    fn cancel(&self, handle: Self::Handle);
}

/// Scheduler backed by tokio timers. Each scheduled task is its own spawned
/// future, so cancelling is an abort.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// The runtime handle lets threads outside the runtime schedule timers.
    pub fn new(runtime: Handle) -> Self {
        TokioScheduler { runtime }
    }

    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    type Handle = AbortHandle;

    fn schedule(&self, delay: Duration, task: SleepTask) -> AbortHandle {
        self.runtime
            .spawn(async move {
                tokio::time::sleep(delay).await;
                task();
            })
            .abort_handle()
    }

    fn cancel(&self, handle: AbortHandle) {
        handle.abort();
    }
}

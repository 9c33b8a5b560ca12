//! Sweeper
//!
//! Background task that periodically evicts expired messages.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Anything the sweeper can evict expired elements from
pub trait Sweep: Send + Sync + 'static {
    /// Remove every element whose deadline lies strictly before `now`,
    /// returns count of removed elements
    fn sweep_expired(&self, now: Instant) -> usize;
}

/// Background sweep task
///
/// Holds only a weak reference to its target, so it exits once every store
/// handle is gone, or earlier when the shutdown channel flips to `true`.
pub struct Sweeper<S: Sweep> {
    target: Weak<S>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S: Sweep> Sweeper<S> {
    pub fn new(target: &Arc<S>, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            target: Arc::downgrade(target),
            interval,
            shutdown,
        }
    }

    /// Run the sweeper (should be spawned as a task)
    pub async fn run(mut self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "Sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(target) = self.target.upgrade() else {
                        break;
                    };
                    let removed = target.sweep_expired(Instant::now());
                    if removed > 0 {
                        debug!(removed = removed, "Swept expired messages");
                    }
                }
                changed = self.shutdown.changed() => {
                    // A dropped sender means the store is gone.
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sweeper stopped");
    }

    /// Spawn the sweeper on the given runtime
    pub fn spawn(self, handle: &Handle) -> JoinHandle<()> {
        handle.spawn(self.run())
    }
}

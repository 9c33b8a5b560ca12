//! Store Configuration

use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Store configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Remaining lifetime granted to a message once it has been read
    pub view_window: Duration,

    /// Sweeper tick interval
    pub sweep_interval: Duration,

    /// Number of partitions for `ShardedStore` (0 = auto-detect)
    pub shards: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            view_window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
            shards: 0, // Auto-detect (num_cores * 4)
        }
    }
}

impl StoreConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view window applied by reads
    pub fn with_view_window(mut self, window: Duration) -> Self {
        self.view_window = window;
        self
    }

    /// Set the sweeper interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the shard count used by `ShardedStore`
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Shard count with auto-detection resolved
    pub fn shard_count(&self) -> usize {
        if self.shards == 0 {
            num_cpus::get() * 4
        } else {
            self.shards
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.view_window.is_zero() {
            return Err(Error::InvalidConfig(
                "view window must be greater than zero".to_string(),
            ));
        }

        let now = Instant::now();
        if now.checked_add(self.sweep_interval).is_none() {
            return Err(Error::InvalidConfig(format!(
                "sweep interval {:?} is out of range",
                self.sweep_interval
            )));
        }
        if now.checked_add(self.view_window).is_none() {
            return Err(Error::InvalidConfig(format!(
                "view window {:?} is out of range",
                self.view_window
            )));
        }
        Ok(())
    }
}

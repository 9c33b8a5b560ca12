//! Sharded Message Store
//!
//! Same semantics as `Store`, but keys are spread over independently locked
//! partitions so unrelated keys do not contend. One sweeper covers all shards.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::element::deadline_after;
use super::index::ExpiryIndex;
use super::sweeper::{Sweep, Sweeper};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::metrics::{StatsSnapshot, StoreStats};

struct ShardedInner {
    shards: Vec<Mutex<ExpiryIndex>>,
    config: StoreConfig,
    stats: StoreStats,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ShardedInner {
    #[inline]
    fn shard(&self, key: &Uuid) -> &Mutex<ExpiryIndex> {
        let (hi, lo) = key.as_u64_pair();
        let slot = (hi ^ lo) % self.shards.len() as u64;
        &self.shards[slot as usize]
    }
}

impl Sweep for ShardedInner {
    fn sweep_expired(&self, now: Instant) -> usize {
        // One shard locked at a time.
        let removed: usize = self
            .shards
            .iter()
            .map(|shard| shard.lock().drain_expired(now))
            .sum();
        self.stats.record_swept(removed);
        removed
    }
}

/// Partitioned store of self-destructing messages
#[derive(Clone)]
pub struct ShardedStore {
    inner: Arc<ShardedInner>,
}

impl ShardedStore {
    /// Create a sharded store and start its sweeper
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let shards = (0..config.shard_count())
            .map(|_| Mutex::new(ExpiryIndex::new()))
            .collect();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = config.sweep_interval;
        let inner = Arc::new(ShardedInner {
            shards,
            config,
            stats: StoreStats::new(),
            shutdown_tx,
            sweeper: Mutex::new(None),
        });

        let task = Sweeper::new(&inner, interval, shutdown_rx).spawn(&handle);
        *inner.sweeper.lock() = Some(task);

        Ok(Self { inner })
    }

    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    /// Store a message; false if the key is already present
    pub fn add(&self, key: Uuid, message: impl Into<String>, expires: Instant) -> bool {
        let inserted = self.inner.shard(&key).lock().insert(key, message.into(), expires);
        self.inner.stats.record_add(inserted);
        inserted
    }

    pub fn add_with_ttl(&self, key: Uuid, message: impl Into<String>, ttl: Duration) -> bool {
        self.add(key, message, deadline_after(Instant::now(), ttl))
    }

    /// Read a message, capping its remaining lifetime at the view window
    pub fn get(&self, key: &Uuid) -> Option<String> {
        let viewed = self
            .inner
            .shard(key)
            .lock()
            .read(key, Instant::now(), self.inner.config.view_window);
        self.inner.stats.record_read(
            viewed.is_some(),
            viewed.as_ref().map(|v| v.shortened).unwrap_or(false),
        );
        viewed.map(|v| v.message)
    }

    pub fn expires_at(&self, key: &Uuid) -> Option<Instant> {
        self.inner.shard(key).lock().expires_at(key)
    }

    /// Total stored messages across shards (approximate under concurrent writes)
    pub fn len(&self) -> usize {
        self.inner.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sweep_now(&self) -> usize {
        self.inner.sweep_expired(Instant::now())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stop the sweeper and wait for it to exit
    pub async fn shutdown(&self) {
        self.inner.shutdown_tx.send_replace(true);
        let task = self.inner.sweeper.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

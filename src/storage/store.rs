//! Self-Destructing Message Store
//!
//! Expiring key-value store with read-capped lifetimes. A single mutex guards
//! both indexes; a background sweeper evicts messages past their deadline.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use super::element::deadline_after;
use super::index::ExpiryIndex;
use super::sweeper::{Sweep, Sweeper};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::metrics::{StatsSnapshot, StoreStats};

struct StoreInner {
    index: Mutex<ExpiryIndex>,
    config: StoreConfig,
    stats: StoreStats,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Sweep for StoreInner {
    fn sweep_expired(&self, now: Instant) -> usize {
        let removed = self.index.lock().drain_expired(now);
        self.stats.record_swept(removed);
        removed
    }
}

/// Thread-safe store of self-destructing messages
///
/// Cloning yields another handle to the same store. The sweeper stops on
/// `shutdown()` or once the last handle is dropped.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a store with the default configuration and start its sweeper
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime. Use `with_config` to get
    /// an error instead.
    pub fn new() -> Self {
        match Self::with_config(StoreConfig::default()) {
            Ok(store) => store,
            Err(e) => panic!("selfdestruct::Store::new: {}", e),
        }
    }

    /// Create a store with a custom configuration and start its sweeper
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = config.sweep_interval;
        let inner = Arc::new(StoreInner {
            index: Mutex::new(ExpiryIndex::new()),
            config,
            stats: StoreStats::new(),
            shutdown_tx,
            sweeper: Mutex::new(None),
        });

        let task = Sweeper::new(&inner, interval, shutdown_rx).spawn(&handle);
        *inner.sweeper.lock() = Some(task);

        Ok(Self { inner })
    }

    /// Store a message under a fresh key. Returns false, changing nothing,
    /// if the key is already present.
    ///
    /// The deadline is not validated; one already in the past makes the
    /// message eligible for the next sweep.
    pub fn add(&self, key: Uuid, message: impl Into<String>, expires: Instant) -> bool {
        let inserted = self.inner.index.lock().insert(key, message.into(), expires);
        self.inner.stats.record_add(inserted);
        if !inserted {
            debug!(%key, "Rejected duplicate key");
        }
        inserted
    }

    /// Store a message that expires `ttl` from now. TTLs beyond `MAX_TTL`
    /// are clamped to it.
    pub fn add_with_ttl(&self, key: Uuid, message: impl Into<String>, ttl: Duration) -> bool {
        self.add(key, message, deadline_after(Instant::now(), ttl))
    }

    /// Read a message. Returns None if the key never existed or has expired.
    ///
    /// A successful read caps the remaining lifetime at the view window;
    /// deadlines are never extended.
    pub fn get(&self, key: &Uuid) -> Option<String> {
        let now = Instant::now();
        let viewed = self
            .inner
            .index
            .lock()
            .read(key, now, self.inner.config.view_window);

        match viewed {
            Some(viewed) => {
                self.inner.stats.record_read(true, viewed.shortened);
                if viewed.shortened {
                    trace!(%key, "Deadline capped by view window");
                }
                Some(viewed.message)
            }
            None => {
                self.inner.stats.record_read(false, false);
                None
            }
        }
    }

    /// Current deadline of a key, including messages awaiting the sweeper
    pub fn expires_at(&self, key: &Uuid) -> Option<Instant> {
        self.inner.index.lock().expires_at(key)
    }

    /// Number of stored messages (including expired but not yet swept)
    pub fn len(&self) -> usize {
        self.inner.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one sweep immediately, returns count of removed messages
    pub fn sweep_now(&self) -> usize {
        self.inner.sweep_expired(Instant::now())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stop the sweeper and wait for it to exit. Reads and writes keep
    /// working afterwards, but nothing is evicted any more.
    pub async fn shutdown(&self) {
        self.inner.shutdown_tx.send_replace(true);
        let task = self.inner.sweeper.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        self.inner.index.lock().is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::element::MAX_TTL;
    use std::thread;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_add_and_read_caps_lifetime() {
        let store = Store::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        assert!(store.add(key, "secret", now + Duration::from_secs(600)));
        assert_eq!(store.get(&key), Some("secret".to_string()));
        assert_eq!(store.expires_at(&key), Some(now + Duration::from_secs(60)));

        // Same key again: refused, original untouched.
        assert!(!store.add(key, "other", now + Duration::from_secs(300)));
        assert_eq!(store.get(&key), Some("secret".to_string()));
        assert_eq!(store.expires_at(&key), Some(now + Duration::from_secs(60)));

        let stats = store.stats();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.shortened, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_reads_do_not_extend() {
        let store = Store::new();
        let key = Uuid::new_v4();
        let start = Instant::now();
        store.add_with_ttl(key, "note", Duration::from_secs(600));

        store.get(&key);
        sleep(Duration::from_secs(30)).await;
        store.get(&key);
        assert_eq!(store.expires_at(&key), Some(start + Duration::from_secs(60)));

        sleep(Duration::from_secs(32)).await;
        assert_eq!(store.get(&key), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_deadline_untouched_by_read() {
        let store = Store::new();
        let key = Uuid::new_v4();
        let deadline = Instant::now() + Duration::from_secs(10);
        store.add(key, "brief", deadline);

        assert_eq!(store.get(&key), Some("brief".to_string()));
        assert_eq!(store.expires_at(&key), Some(deadline));
        assert_eq!(store.stats().shortened, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_expired_is_swept_within_one_tick() {
        let store = Store::new();
        let key = Uuid::new_v4();
        store.add(key, "hi", Instant::now() - Duration::from_secs(1));

        assert_eq!(store.get(&key), None);
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get(&key), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().swept, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_expirations_drained_in_one_tick() {
        let store = Store::new();
        let deadline = Instant::now() + Duration::from_millis(100);
        for i in 0..50 {
            store.add(Uuid::new_v4(), format!("msg{}", i), deadline);
        }
        let survivor = Uuid::new_v4();
        store.add_with_ttl(survivor, "stays", Duration::from_secs(30));

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&survivor), Some("stays".to_string()));
        assert!(store.is_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_after_deadline_plus_interval() {
        let store = Store::new();
        let key = Uuid::new_v4();
        store.add_with_ttl(key, "ttl", Duration::from_millis(2500));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(store.len(), 1);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(store.len(), 0);
        assert_eq!(store.get(&key), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeping() {
        let store = Store::new();
        store.shutdown().await;

        let key = Uuid::new_v4();
        store.add(key, "lingering", Instant::now() - Duration::from_secs(1));
        sleep(Duration::from_secs(5)).await;

        // Never exposed, but no longer evicted automatically.
        assert_eq!(store.get(&key), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.sweep_now(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_custom_config() {
        let config = StoreConfig::default()
            .with_view_window(Duration::from_secs(5))
            .with_sweep_interval(Duration::from_millis(100));
        let store = Store::with_config(config).unwrap();
        let key = Uuid::new_v4();
        let before = Instant::now();
        store.add_with_ttl(key, "short view", Duration::from_secs(600));
        store.get(&key);

        let capped = store.expires_at(&key).unwrap();
        assert!(capped >= before + Duration::from_secs(5));
        assert!(capped <= Instant::now() + Duration::from_secs(5));
        assert_eq!(store.config().sweep_interval, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let store = Store::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        assert!(store.add_with_ttl(key, "forever", Duration::MAX));
        assert_eq!(store.expires_at(&key), Some(now + MAX_TTL));
        assert!(store.add_with_ttl(Uuid::new_v4(), "also", Duration::from_secs(u64::MAX)));

        // Reading still caps at the view window.
        assert_eq!(store.get(&key), Some("forever".to_string()));
        assert_eq!(store.expires_at(&key), Some(now + Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_unrepresentable_view_window_rejected() {
        let config = StoreConfig::default().with_view_window(Duration::MAX);
        assert!(matches!(
            Store::with_config(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = StoreConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(
            Store::with_config(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(
            Store::with_config(StoreConfig::default()),
            Err(Error::NoRuntime)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let store = Store::new();
        let keys: Vec<Uuid> = (0..100).map(|_| Uuid::new_v4()).collect();

        // Every thread races to add the same keys, then reads them back.
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = store.clone();
                let keys = keys.clone();
                thread::spawn(move || {
                    let mut won = 0;
                    for (j, key) in keys.iter().enumerate() {
                        let ttl = Duration::from_secs(60 + (i * 100 + j) as u64);
                        if s.add_with_ttl(*key, format!("{}-{}", i, j), ttl) {
                            won += 1;
                        }
                        assert!(s.get(key).is_some());
                    }
                    won
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, keys.len());
        assert_eq!(store.len(), keys.len());
        assert_eq!(store.stats().rejected, 7 * keys.len() as u64);
        assert!(store.is_consistent());
    }
}

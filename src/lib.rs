//! SELFDESTRUCT - In-Memory Self-Destructing Message Store
//!
//! Keyed text messages that expire on their own. Reading a message caps its
//! remaining lifetime at a short view window, so repeated reads cannot keep
//! it alive.

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use metrics::{StatsSnapshot, StoreStats};
pub use storage::{ShardedStore, Store, MAX_TTL};
pub use uuid::Uuid;

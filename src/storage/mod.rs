//! Storage Engine
//!
//! Dual-indexed expiring message store with a background sweeper.

mod element;
mod index;
mod sharded;
mod store;
mod sweeper;

pub use element::{deadline_after, Element, MAX_TTL};
pub use index::{ExpiryIndex, Viewed};
pub use sharded::ShardedStore;
pub use store::Store;
pub use sweeper::{Sweep, Sweeper};

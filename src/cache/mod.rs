//! Query cache for the public read surface.
//!
//! Published post pages, posts by category, single posts, categories and
//! episodes are held in one LRU keyed by [`QueryKey`]. Entries go stale after
//! the configured TTL and are dropped eagerly by [`QueryCache::invalidate`]
//! whenever a mutation touches their [`CacheScope`]. Readers take a
//! [`FillTicket`] before querying the store, so a result read across an
//! invalidation is never cached. The store stays the source of truth; a
//! disabled cache simply never holds anything.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 300
//! capacity = 64
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheScope, QueryKey};
pub use store::{FillTicket, QueryCache};

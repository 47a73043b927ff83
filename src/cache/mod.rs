//! Rating cache and its backing stores

mod ratings;
mod store;

pub use ratings::{CacheEntry, RatingCache, CACHE_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};

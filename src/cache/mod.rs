//! Cache layer
//!
//! An in-process moka cache behind the `CacheLayer` trait. Values are stored
//! as JSON so any serializable type can be cached. The places lookup wrapper
//! in [`places`] is the main consumer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ayunetra::cache::{CacheLayer, MemoryCache};
//!
//! let cache = MemoryCache::with_capacity_and_ttl(1_000, Duration::from_secs(300));
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;
pub mod places;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub use memory::MemoryCache;
pub use places::CachedPlacesLookup;

/// Cache layer trait
///
/// The generic methods make this trait unusable as `dyn CacheLayer`; hold the
/// concrete cache type instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;
}

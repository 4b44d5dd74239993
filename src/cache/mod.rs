//! Time-bounded result caching.
//!
//! Address lists are cached per chain, assembled collections per [`CollectionKey`]. Every
//! entry expires after the cache's TTL; there is no per-entry override. Concurrent writers
//! race and the last write wins.

use crate::{platform::PlatformClass, types::RaffleRecord};
use alloy::primitives::{Address, ChainId};
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

mod metrics;
pub use self::metrics::{CacheMetrics, MetricsSnapshot};

/// Default time-to-live of cached entries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Key of a cached raffle collection.
///
/// Collections fetched under different platform classes or ceilings never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    /// The chain the collection was fetched from.
    pub chain_id: ChainId,
    /// Platform class of the fetch session.
    pub platform: PlatformClass,
    /// Fetch ceiling of the session.
    pub max_items: usize,
}

impl CollectionKey {
    /// Creates a new key.
    pub fn new(chain_id: ChainId, platform: PlatformClass, max_items: usize) -> Self {
        Self { chain_id, platform, max_items }
    }
}

/// A cached payload and when it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    payload: T,
    inserted_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(payload: T) -> Self {
        Self { payload, inserted_at: Instant::now() }
    }

    /// Returns the payload unless the entry is at least `ttl` old.
    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.inserted_at.elapsed() < ttl).then(|| self.payload.clone())
    }
}

/// TTL cache for discovered addresses and assembled collections.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    addresses: DashMap<ChainId, CacheEntry<Vec<Address>>>,
    collections: DashMap<CollectionKey, CacheEntry<Vec<RaffleRecord>>>,
    metrics: CacheMetrics,
}

impl ResultCache {
    /// Creates a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            addresses: DashMap::new(),
            collections: DashMap::new(),
            metrics: CacheMetrics::new("results"),
        }
    }

    /// The time-to-live of every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached raffle addresses of a chain, newest first.
    pub fn get_addresses(&self, chain_id: ChainId) -> Option<Vec<Address>> {
        let addresses = self.addresses.get(&chain_id).and_then(|entry| entry.fresh(self.ttl));
        match &addresses {
            Some(addresses) => {
                self.metrics.record_hit("addresses");
                debug!(chain_id, count = addresses.len(), "Address cache HIT");
            }
            None => {
                self.metrics.record_miss("addresses");
                debug!(chain_id, "Address cache MISS");
            }
        }
        addresses
    }

    /// Cache the raffle addresses of a chain, replacing any previous entry.
    pub fn put_addresses(&self, chain_id: ChainId, addresses: Vec<Address>) {
        trace!(chain_id, count = addresses.len(), "Caching raffle addresses");
        self.addresses.insert(chain_id, CacheEntry::new(addresses));
    }

    /// Get a cached collection.
    pub fn get_collection(&self, key: &CollectionKey) -> Option<Vec<RaffleRecord>> {
        let records = self.collections.get(key).and_then(|entry| entry.fresh(self.ttl));
        match &records {
            Some(records) => {
                self.metrics.record_hit("collection");
                debug!(?key, count = records.len(), "Collection cache HIT");
            }
            None => {
                self.metrics.record_miss("collection");
                debug!(?key, "Collection cache MISS");
            }
        }
        records
    }

    /// Cache a collection, replacing any previous entry.
    pub fn put_collection(&self, key: CollectionKey, records: Vec<RaffleRecord>) {
        trace!(?key, count = records.len(), "Caching raffle collection");
        self.collections.insert(key, CacheEntry::new(records));
    }

    /// Drops the address list and every collection of a chain.
    pub fn invalidate_chain(&self, chain_id: ChainId) {
        debug!(chain_id, "Invalidating cached raffles");
        self.addresses.remove(&chain_id);
        self.collections.retain(|key, _| key.chain_id != chain_id);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        debug!("Clearing result cache");
        self.addresses.clear();
        self.collections.clear();
        self.metrics.record_clear();
    }

    /// Get cache statistics for monitoring.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            address_lists: self.addresses.len(),
            collections: self.collections.len(),
            metrics: self.metrics.snapshot(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached address lists, expired ones included
    pub address_lists: usize,
    /// Number of cached collections, expired ones included
    pub collections: usize,
    /// Hit and miss counts
    pub metrics: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const RAFFLE: Address = address!("0x1234567890123456789012345678901234567890");

    #[tokio::test(start_paused = true)]
    async fn entries_expire_at_ttl() {
        let ttl = Duration::from_secs(60);
        let cache = ResultCache::new(ttl);
        cache.put_addresses(1, vec![RAFFLE]);

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert_eq!(cache.get_addresses(1), Some(vec![RAFFLE]));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get_addresses(1), None);

        let stats = cache.stats();
        assert_eq!(stats.metrics.hits, 1);
        assert_eq!(stats.metrics.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_a_miss_exactly_at_ttl() {
        let ttl = Duration::from_secs(60);
        let cache = ResultCache::new(ttl);
        cache.put_collection(CollectionKey::new(1, PlatformClass::Unconstrained, 100), vec![]);

        tokio::time::advance(ttl).await;
        assert_eq!(
            cache.get_collection(&CollectionKey::new(1, PlatformClass::Unconstrained, 100)),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn collections_are_scoped_by_platform_and_ceiling() {
        let cache = ResultCache::default();
        let desktop = CollectionKey::new(1, PlatformClass::Unconstrained, 100);
        cache.put_collection(desktop, vec![]);

        assert_eq!(cache.get_collection(&desktop), Some(vec![]));
        for other in [
            CollectionKey::new(1, PlatformClass::Constrained, 20),
            CollectionKey::new(1, PlatformClass::Unconstrained, 20),
            CollectionKey::new(10, PlatformClass::Unconstrained, 100),
        ] {
            assert_eq!(cache.get_collection(&other), None, "{other:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rewrite_refreshes_entry() {
        let ttl = Duration::from_secs(60);
        let cache = ResultCache::new(ttl);
        cache.put_addresses(1, vec![]);

        tokio::time::advance(ttl / 2).await;
        cache.put_addresses(1, vec![RAFFLE]);

        tokio::time::advance(ttl / 2 + Duration::from_millis(1)).await;
        assert_eq!(cache.get_addresses(1), Some(vec![RAFFLE]));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_and_clear() {
        let cache = ResultCache::default();
        cache.put_addresses(1, vec![RAFFLE]);
        cache.put_addresses(10, vec![RAFFLE]);
        cache.put_collection(CollectionKey::new(1, PlatformClass::Constrained, 20), vec![]);

        cache.invalidate_chain(1);
        assert_eq!(cache.get_addresses(1), None);
        assert_eq!(cache.get_addresses(10), Some(vec![RAFFLE]));
        assert_eq!(cache.stats().collections, 0);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.address_lists, 0);
        assert_eq!(stats.metrics.clears, 1);
    }
}

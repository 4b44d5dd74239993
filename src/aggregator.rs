//! The process-level entry point.

use crate::{
    cache::{CollectionKey, ResultCache},
    chains::{ChainHandle, Chains},
    config::AggregatorConfig,
    error::AggregatorError,
    metrics::OperationMetrics,
    platform::{PlatformHint, PlatformProfile},
    reader::ProviderReader,
    retry::RetryExecutor,
    services::{AddressDiscovery, BatchOrchestrator, FetchContext, RaffleDetailFetcher},
    types::RaffleRecord,
};
use alloy::{
    primitives::{Address, ChainId},
    providers::{Provider, ProviderBuilder},
};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{info, instrument};

/// Options of a [`RaffleAggregator::fetch_raffles`] call.
pub struct FetchOptions<'a> {
    /// Serve the collection and the address list from the cache when fresh.
    pub use_cache: bool,
    on_progress: Option<Box<dyn FnMut(usize, usize) + Send + 'a>>,
}

impl<'a> FetchOptions<'a> {
    /// Bypasses the cache. Results are still written back.
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Sets the progress callback, called with `(done, total)`.
    pub fn with_progress(mut self, on_progress: impl FnMut(usize, usize) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }
}

impl Default for FetchOptions<'_> {
    fn default() -> Self {
        Self { use_cache: true, on_progress: None }
    }
}

impl fmt::Debug for FetchOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("use_cache", &self.use_cache)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Aggregates the raffles of one or more chains.
///
/// Holds the chain readers, the result cache and the operation metrics. Construct it once and
/// share it by reference.
#[derive(Debug)]
pub struct RaffleAggregator {
    chains: Chains,
    cache: ResultCache,
    metrics: Arc<OperationMetrics>,
}

impl RaffleAggregator {
    /// Creates an aggregator with the default cache TTL.
    pub fn new(chains: Chains) -> Self {
        Self { chains, cache: ResultCache::default(), metrics: Arc::default() }
    }

    /// Replaces the cache with an empty one whose entries live for `ttl`.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = ResultCache::new(ttl);
        self
    }

    /// Creates an aggregator reading every configured chain over HTTP.
    pub fn from_config(config: &AggregatorConfig) -> Self {
        let chains = config.chains.iter().map(|(chain_id, chain)| {
            let provider = ProviderBuilder::new().connect_http(chain.endpoint.clone()).erased();
            let mut handle = ChainHandle::new(*chain_id, Arc::new(ProviderReader::new(provider)));
            if let Some(registry) = chain.registry {
                handle = handle.with_registry(registry);
            }
            if let Some(multicall) = chain.multicall {
                handle = handle.with_multicall(Some(multicall));
            }
            handle
        });
        Self::new(Chains::new(chains)).with_cache_ttl(config.cache.ttl)
    }

    /// The configured chains.
    pub fn chains(&self) -> &Chains {
        &self.chains
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Timings and error counts of every remote operation so far.
    pub fn metrics(&self) -> &OperationMetrics {
        &self.metrics
    }

    /// Returns the raffles of a chain, newest first.
    ///
    /// At most the profile's `max_items` raffles are fetched. Raffles that cannot be assembled
    /// are left out; only a failure to list the raffles fails the call.
    #[instrument(skip_all, fields(chain_id = chain_id, platform = %hint.class()))]
    pub async fn fetch_raffles(
        &self,
        chain_id: ChainId,
        hint: &PlatformHint,
        options: FetchOptions<'_>,
    ) -> Result<Vec<RaffleRecord>, AggregatorError> {
        let FetchOptions { use_cache, mut on_progress } = options;
        let chain = self.chain(chain_id)?;
        let profile = PlatformProfile::select(hint);
        let key = CollectionKey::new(chain_id, profile.class, profile.max_items);

        if use_cache && let Some(records) = self.cache.get_collection(&key) {
            return Ok(records);
        }

        let ctx = self.context(chain, profile);
        let mut addresses = AddressDiscovery::new(&self.cache).discover(&ctx, use_cache).await?;
        let discovered = addresses.len();
        addresses.truncate(profile.max_items);

        let records = BatchOrchestrator::new(&ctx)
            .fetch_all(&addresses, |done, total| {
                if let Some(on_progress) = on_progress.as_mut() {
                    on_progress(done, total);
                }
            })
            .await;

        info!(discovered, fetched = records.len(), "Fetched raffles");
        self.cache.put_collection(key, records.clone());
        Ok(records)
    }

    /// Fetches the raffles of a chain bypassing the cache, replacing the cached entries.
    pub async fn refresh(
        &self,
        chain_id: ChainId,
        hint: &PlatformHint,
        on_progress: impl FnMut(usize, usize) + Send,
    ) -> Result<Vec<RaffleRecord>, AggregatorError> {
        let options = FetchOptions::default().no_cache().with_progress(on_progress);
        self.fetch_raffles(chain_id, hint, options).await
    }

    /// Fetches a single raffle. Never cached.
    #[instrument(skip_all, fields(chain_id = chain_id, %address))]
    pub async fn fetch_raffle(
        &self,
        chain_id: ChainId,
        address: Address,
        hint: &PlatformHint,
    ) -> Result<RaffleRecord, AggregatorError> {
        let ctx = self.context(self.chain(chain_id)?, PlatformProfile::select(hint));
        Ok(RaffleDetailFetcher::new(&ctx).try_fetch(address).await?)
    }

    /// Returns the current block number of a chain.
    pub async fn block_number(&self, chain_id: ChainId) -> Result<u64, AggregatorError> {
        let chain = self.chain(chain_id)?;
        let executor = RetryExecutor::new(PlatformProfile::UNCONSTRAINED, self.metrics.clone());
        Ok(executor.execute("chain.blockNumber", || chain.reader.block_number()).await?)
    }

    /// Drops the cached raffles of a chain.
    pub fn invalidate(&self, chain_id: ChainId) {
        self.cache.invalidate_chain(chain_id);
    }

    /// Drops every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn chain(&self, chain_id: ChainId) -> Result<&ChainHandle, AggregatorError> {
        self.chains.get(chain_id).ok_or(AggregatorError::UnsupportedChain(chain_id))
    }

    fn context(&self, chain: &ChainHandle, profile: PlatformProfile) -> FetchContext {
        FetchContext::new(chain, profile, self.metrics.clone())
    }
}

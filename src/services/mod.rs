//! Fetch pipeline: address discovery, per-raffle detail reads and batch orchestration.

mod discovery;
pub use discovery::AddressDiscovery;

mod fetcher;
pub use fetcher::RaffleDetailFetcher;

mod orchestrator;
pub use orchestrator::{BatchOrchestrator, PROGRESSIVE_ITEM_DELAY};

use crate::{
    chains::ChainHandle,
    metrics::EventSink,
    multicall::MulticallBatcher,
    platform::PlatformProfile,
    reader::ContractReader,
    retry::RetryExecutor,
};
use alloy::primitives::{Address, ChainId};
use std::sync::Arc;

/// Everything a fetch session needs to read one chain under one platform profile.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// The chain being read.
    pub chain_id: ChainId,
    /// The raffle registry of the chain.
    pub registry: Option<Address>,
    /// Reader for the chain.
    pub reader: Arc<dyn ContractReader>,
    /// Retry policy of the session.
    pub executor: RetryExecutor,
    /// Batcher of the chain.
    pub batcher: MulticallBatcher,
}

impl FetchContext {
    /// Creates a context for `chain`, reporting every attempt to `sink`.
    pub fn new(chain: &ChainHandle, profile: PlatformProfile, sink: Arc<dyn EventSink>) -> Self {
        let executor = RetryExecutor::new(profile, sink);
        let batcher =
            MulticallBatcher::new(chain.reader.clone(), chain.multicall, executor.clone());
        Self {
            chain_id: chain.chain_id,
            registry: chain.registry,
            reader: chain.reader.clone(),
            executor,
            batcher,
        }
    }

    /// The profile of the session.
    pub fn profile(&self) -> &PlatformProfile {
        self.executor.profile()
    }
}

//! Raffle address discovery through the registry contract.

use super::FetchContext;
use crate::{
    cache::ResultCache,
    error::{AggregatorError, ReadError},
    types::IRaffleRegistry,
};
use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use tracing::{debug, instrument, warn};

/// Lists the raffles deployed through a chain's registry.
#[derive(Debug, Clone, Copy)]
pub struct AddressDiscovery<'a> {
    cache: &'a ResultCache,
}

impl<'a> AddressDiscovery<'a> {
    /// Creates a discovery backed by `cache`.
    pub fn new(cache: &'a ResultCache) -> Self {
        Self { cache }
    }

    /// Returns every raffle of the chain, newest first.
    ///
    /// With `use_cache` a fresh cached list is returned without a remote read. A successful
    /// read always replaces the cached list.
    #[instrument(skip_all, fields(chain_id = ctx.chain_id))]
    pub async fn discover(
        &self,
        ctx: &FetchContext,
        use_cache: bool,
    ) -> Result<Vec<Address>, AggregatorError> {
        let chain_id = ctx.chain_id;
        let registry = ctx.registry.ok_or(AggregatorError::ContractsNotAvailable(chain_id))?;

        if use_cache && let Some(addresses) = self.cache.get_addresses(chain_id) {
            return Ok(addresses);
        }

        let input: Bytes = IRaffleRegistry::getAllRafflesCall {}.abi_encode().into();
        let mut addresses = ctx
            .executor
            .execute("registry.getAllRaffles", || {
                let input = input.clone();
                async move {
                    let output = ctx.reader.call(registry, input).await?;
                    Ok::<_, ReadError>(IRaffleRegistry::getAllRafflesCall::abi_decode_returns(
                        &output,
                    )?)
                }
            })
            .await
            .map_err(|source| {
                warn!(%registry, %source, "Failed to list raffles");
                AggregatorError::AddressDiscoveryFailed { chain_id, source }
            })?;

        // the registry lists raffles in deployment order
        addresses.reverse();
        debug!(%registry, count = addresses.len(), "Discovered raffles");

        self.cache.put_addresses(chain_id, addresses.clone());
        Ok(addresses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chains::ChainHandle,
        error::ErrorClass,
        metrics::NoopSink,
        platform::PlatformProfile,
        test_utils::{MOCK_REGISTRY, MockChain},
    };
    use std::sync::Arc;

    fn context(chain: Arc<MockChain>, registry: Option<Address>) -> FetchContext {
        let mut handle = ChainHandle::new(31337, chain.clone()).with_multicall(chain.multicall());
        handle.registry = registry;
        FetchContext::new(&handle, PlatformProfile::UNCONSTRAINED, Arc::new(NoopSink))
    }

    #[tokio::test]
    async fn lists_newest_first_and_caches() {
        let chain = Arc::new(MockChain::new().with_active_raffles(3));
        let ctx = context(chain.clone(), Some(MOCK_REGISTRY));
        let cache = ResultCache::default();
        let discovery = AddressDiscovery::new(&cache);

        let addresses = discovery.discover(&ctx, true).await.unwrap();
        let mut expected = chain.deployed().to_vec();
        expected.reverse();
        assert_eq!(addresses, expected);
        assert_eq!(chain.calls(), 1);

        assert_eq!(discovery.discover(&ctx, true).await.unwrap(), expected);
        assert_eq!(chain.calls(), 1);

        discovery.discover(&ctx, false).await.unwrap();
        assert_eq!(chain.calls(), 2);
    }

    #[tokio::test]
    async fn empty_registry_is_not_an_error() {
        let chain = Arc::new(MockChain::new());
        let cache = ResultCache::default();
        let addresses = AddressDiscovery::new(&cache)
            .discover(&context(chain, Some(MOCK_REGISTRY)), true)
            .await
            .unwrap();
        assert!(addresses.is_empty());
    }

    #[tokio::test]
    async fn missing_registry() {
        let chain = Arc::new(MockChain::new().with_active_raffles(1));
        let cache = ResultCache::default();
        let err = AddressDiscovery::new(&cache)
            .discover(&context(chain.clone(), None), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AggregatorError::ContractsNotAvailable(31337)));
        assert_eq!(chain.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn registry_failure_is_a_network_discovery_failure() {
        let chain = Arc::new(MockChain::new().with_failing_registry());
        let cache = ResultCache::default();
        let err = AddressDiscovery::new(&cache)
            .discover(&context(chain.clone(), Some(MOCK_REGISTRY)), true)
            .await
            .unwrap_err();

        assert!(matches!(err, AggregatorError::AddressDiscoveryFailed { chain_id: 31337, .. }));
        assert_eq!(err.class(), Some(ErrorClass::Network));
        assert!(err.is_discovery_failure());
        assert_eq!(chain.calls(), PlatformProfile::UNCONSTRAINED.retry_count as usize);
        assert_eq!(cache.stats().address_lists, 0);
    }
}

//! The chains the aggregator reads from.

use crate::reader::ContractReader;
use alloy::primitives::{Address, ChainId, address, map::HashMap};
use alloy_chains::NamedChain;
use std::sync::Arc;

/// Canonical Multicall3 deployment address.
///
/// See <https://github.com/mds1/multicall#multicall3-contract-addresses>
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Chains with a known Multicall3 deployment.
const MULTICALL3_CHAINS: &[NamedChain] = &[
    NamedChain::Mainnet,
    NamedChain::Sepolia,
    NamedChain::Optimism,
    NamedChain::OptimismSepolia,
    NamedChain::Base,
    NamedChain::BaseSepolia,
    NamedChain::Arbitrum,
    NamedChain::ArbitrumSepolia,
    NamedChain::Polygon,
    NamedChain::Avalanche,
    NamedChain::BinanceSmartChain,
];

/// Returns the Multicall3 helper of a chain, if one is known.
///
/// `None` means batching is unavailable on the chain; it is not an error.
pub fn multicall_address(chain_id: ChainId) -> Option<Address> {
    MULTICALL3_CHAINS.iter().any(|chain| *chain as u64 == chain_id).then_some(MULTICALL3_ADDRESS)
}

/// A single configured chain.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    /// The chain ID.
    pub chain_id: ChainId,
    /// Reader for the chain.
    pub reader: Arc<dyn ContractReader>,
    /// The raffle registry, if deployed on this chain.
    pub registry: Option<Address>,
    /// The Multicall3 helper, if available on this chain.
    pub multicall: Option<Address>,
}

impl ChainHandle {
    /// Creates a handle without a registry, using the static Multicall3 table.
    pub fn new(chain_id: ChainId, reader: Arc<dyn ContractReader>) -> Self {
        Self { chain_id, reader, registry: None, multicall: multicall_address(chain_id) }
    }

    /// Sets the registry address.
    pub fn with_registry(mut self, registry: Address) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Overrides the Multicall3 helper. `None` disables batching.
    pub fn with_multicall(mut self, multicall: Option<Address>) -> Self {
        self.multicall = multicall;
        self
    }
}

/// A collection of chains keyed by chain ID.
#[derive(Debug, Clone, Default)]
pub struct Chains {
    chains: HashMap<ChainId, ChainHandle>,
}

impl Chains {
    /// Creates a collection from handles.
    pub fn new(chains: impl IntoIterator<Item = ChainHandle>) -> Self {
        Self { chains: chains.into_iter().map(|chain| (chain.chain_id, chain)).collect() }
    }

    /// Get a chain for a given chain ID.
    pub fn get(&self, chain_id: ChainId) -> Option<&ChainHandle> {
        self.chains.get(&chain_id)
    }

    /// The configured chain IDs, sorted.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<_> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

//! Aggregator configuration.
use crate::cache::DEFAULT_CACHE_TTL;
use alloy::primitives::{Address, ChainId};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, time::Duration};
use url::Url;

/// Aggregator configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorConfig {
    /// Chain configurations, keyed by chain id or name.
    #[serde(with = "crate::serde::chain_map")]
    pub chains: HashMap<ChainId, ChainConfig>,
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AggregatorConfig {
    /// Adds or replaces a chain.
    pub fn with_chain(mut self, chain_id: ChainId, config: ChainConfig) -> Self {
        self.chains.insert(chain_id, config);
        self
    }

    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    /// The configuration of a chain.
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration of a single chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub endpoint: Url,
    /// The raffle registry. Without one the chain has no raffles to discover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<Address>,
    /// Multicall3 address, overriding the built-in table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicall: Option<Address>,
}

impl ChainConfig {
    /// A chain reached through `endpoint`, without a registry.
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, registry: None, multicall: None }
    }

    /// Sets the registry address.
    pub fn with_registry(mut self, registry: Address) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the Multicall3 address.
    pub fn with_multicall(mut self, multicall: Address) -> Self {
        self.multicall = Some(multicall);
        self
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Time-to-live of cached address lists and collections, in seconds.
    #[serde(with = "crate::serde::duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_CACHE_TTL }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const REGISTRY: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

    #[test]
    fn parse_config() {
        let s = r#"
chains:
  base:
    endpoint: https://mainnet.base.org
    registry: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
  "19088743":
    endpoint: http://localhost:8545
    multicall: "0xcA11bde05977b3631167028862bE2a173976CA11"
cache:
  ttl: 60
"#;
        let config = serde_yaml::from_str::<AggregatorConfig>(s).unwrap();

        let base = config.chain(8453).unwrap();
        assert_eq!(base.endpoint.as_str(), "https://mainnet.base.org/");
        assert_eq!(base.registry, Some(REGISTRY));
        assert_eq!(base.multicall, None);

        let local = config.chain(19_088_743).unwrap();
        assert_eq!(local.registry, None);
        assert!(local.multicall.is_some());

        assert_eq!(config.cache.ttl, Duration::from_secs(60));
    }

    #[test]
    fn cache_defaults() {
        let s = r#"
chains:
  sepolia:
    endpoint: https://rpc.sepolia.org
"#;
        let config = serde_yaml::from_str::<AggregatorConfig>(s).unwrap();
        assert_eq!(config.cache.ttl, DEFAULT_CACHE_TTL);
        assert!(config.chain(11155111).is_some());
    }

    #[test]
    fn save_and_load() {
        let config = AggregatorConfig::default()
            .with_chain(
                8453,
                ChainConfig::new("https://mainnet.base.org".parse().unwrap())
                    .with_registry(REGISTRY),
            )
            .with_cache_ttl(Duration::from_secs(30));

        let path = std::env::temp_dir()
            .join(format!("raffle-aggregator-config-{}.yaml", std::process::id()));
        config.save_to_file(&path).unwrap();
        let loaded = AggregatorConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file() {
        let err = AggregatorConfig::load_from_file("/nonexistent/raffles.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}

//! # Raffle Aggregator
//!
//! Discovers the raffles deployed through a registry contract and fetches their state from
//! unreliable JSON-RPC endpoints, tuned to the client platform.

pub mod aggregator;
pub mod cache;
pub mod chains;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod multicall;
pub mod platform;
pub mod reader;
pub mod retry;
pub mod serde;
pub mod services;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

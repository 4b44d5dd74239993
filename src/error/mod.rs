//! Aggregator error types.
use crate::types::RaffleMethod;
use alloy::{
    primitives::ChainId,
    rpc::json_rpc::ErrorPayload,
    transports::{RpcError, TransportErrorKind},
};
use std::time::Duration;
use thiserror::Error;

mod classify;
pub use classify::{ErrorClass, classify};

mod contracts;
pub use contracts::{BUSINESS_RULES, BusinessRule, RaffleErrors};

/// A failed read against the chain.
#[derive(Debug, Error)]
pub enum ReadError {
    /// An error occurred talking to RPC.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The read did not complete within the profile's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The contract ABI has no function with this name.
    #[error("method `{0}` is not part of the contract abi")]
    UnknownMethod(&'static str),
    /// The call arguments could not be ABI-encoded.
    #[error("failed to encode `{method}`: {source}")]
    Encode {
        /// The method being encoded.
        method: &'static str,
        /// The underlying encoding error.
        #[source]
        source: alloy::dyn_abi::Error,
    },
    /// The returned data does not match the expected output.
    #[error("failed to decode `{method}` output: {reason}")]
    Decode {
        /// The method whose output failed to decode.
        method: &'static str,
        /// Why decoding failed.
        reason: String,
    },
    /// An error occurred during ABI encoding/decoding of a typed call.
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}

impl ReadError {
    /// The JSON-RPC error payload returned by the node, if any.
    pub fn error_payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Rpc(err) => err.as_error_resp(),
            _ => None,
        }
    }

    /// Whether the failure happened below the JSON-RPC layer.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Rpc(RpcError::Transport(_) | RpcError::NullResp))
    }

    /// Classifies this error, see [`classify`].
    pub fn class(&self) -> ErrorClass {
        classify(self)
    }
}

/// A getter a raffle cannot be assembled without could not be read.
#[derive(Debug, Error)]
#[error("required getter `{}` failed: {source}", .method.name())]
pub struct RequiredFieldError {
    /// The getter that failed.
    pub method: RaffleMethod,
    /// The last read failure.
    #[source]
    pub source: ReadError,
}

/// The overarching error type returned by the aggregator.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The chain has no registry contract configured.
    #[error("no raffle contracts are available on chain {0}")]
    ContractsNotAvailable(ChainId),
    /// The registry could not be read, so there is nothing to iterate.
    #[error("failed to discover raffles on chain {chain_id}: {source}")]
    AddressDiscoveryFailed {
        /// The chain being queried.
        chain_id: ChainId,
        /// The read failure.
        #[source]
        source: ReadError,
    },
    /// No reader is configured for the chain.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// A single raffle could not be assembled.
    #[error(transparent)]
    RequiredField(#[from] RequiredFieldError),
    /// A direct read failed.
    #[error(transparent)]
    Read(#[from] ReadError),
}

impl AggregatorError {
    /// Classification of the underlying read failure, if any.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::AddressDiscoveryFailed { source, .. } | Self::Read(source) => {
                Some(source.class())
            }
            Self::RequiredField(err) => Some(err.source.class()),
            Self::ContractsNotAvailable(_) | Self::UnsupportedChain(_) => None,
        }
    }

    /// Whether the error means the raffle list of the chain is unavailable right now.
    ///
    /// This is distinct from a chain without raffles, which yields an empty collection.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(
            self,
            Self::ContractsNotAvailable(_)
                | Self::AddressDiscoveryFailed { .. }
                | Self::UnsupportedChain(_)
        )
    }
}

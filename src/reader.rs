//! Remote read client.

use crate::{
    error::ReadError,
    types::{CallSpec, CallValue, raffle_abi},
};
use alloy::{
    dyn_abi::{FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    network::TransactionBuilder,
    primitives::{Address, Bytes},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use std::{fmt, sync::Arc};

/// Read-only access to a chain.
#[async_trait]
pub trait ContractReader: fmt::Debug + Send + Sync {
    /// Executes `eth_call` against `to` at the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ReadError>;

    /// Returns the current block number.
    async fn block_number(&self) -> Result<u64, ReadError>;
}

/// A [`ContractReader`] backed by an alloy [`Provider`].
#[derive(Clone)]
pub struct ProviderReader<P> {
    provider: P,
}

impl<P> ProviderReader<P> {
    /// Wraps a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> fmt::Debug for ProviderReader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderReader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<P: Provider> ContractReader for ProviderReader<P> {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ReadError> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        Ok(self.provider.call(request).await?)
    }

    async fn block_number(&self) -> Result<u64, ReadError> {
        Ok(self.provider.get_block_number().await?)
    }
}

/// A raffle contract instance: an address, the ABI it is read with, and a reader.
#[derive(Debug, Clone)]
pub struct RaffleContract {
    address: Address,
    abi: &'static JsonAbi,
    reader: Arc<dyn ContractReader>,
}

impl RaffleContract {
    /// Creates a contract read with the current raffle ABI.
    pub fn new(address: Address, reader: Arc<dyn ContractReader>) -> Self {
        Self { address, abi: raffle_abi(), reader }
    }

    /// Reads the contract with a different ABI, e.g. the reduced ABI of an older deployment.
    pub fn with_abi(mut self, abi: &'static JsonAbi) -> Self {
        self.abi = abi;
        self
    }

    /// The contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The ABI the contract is read with.
    pub fn abi(&self) -> &'static JsonAbi {
        self.abi
    }

    /// The reader used for calls.
    pub fn reader(&self) -> &Arc<dyn ContractReader> {
        &self.reader
    }

    /// ABI-encodes a call.
    ///
    /// Fails with [`ReadError::UnknownMethod`] if the ABI has no such function.
    pub fn encode(&self, spec: &CallSpec) -> Result<Bytes, ReadError> {
        let method = spec.method.name();
        self.function(spec)?
            .abi_encode_input(&spec.args)
            .map(Bytes::from)
            .map_err(|source| ReadError::Encode { method, source })
    }

    /// Decodes the return data of a call into a typed value.
    pub fn decode(&self, spec: &CallSpec, data: &[u8]) -> Result<CallValue, ReadError> {
        let method = spec.method.name();
        let output = self
            .function(spec)?
            .abi_decode_output(data)
            .map_err(|err| ReadError::Decode { method, reason: err.to_string() })?
            .into_iter()
            .next()
            .ok_or_else(|| ReadError::Decode { method, reason: "empty output".into() })?;

        CallValue::from_dyn(spec.method.kind(), output).ok_or_else(|| ReadError::Decode {
            method,
            reason: format!("expected {:?} output", spec.method.kind()),
        })
    }

    /// Encodes, executes and decodes a single call.
    pub async fn read(&self, spec: &CallSpec) -> Result<CallValue, ReadError> {
        let input = self.encode(spec)?;
        let output = self.reader.call(self.address, input).await?;
        self.decode(spec, &output)
    }

    fn function(&self, spec: &CallSpec) -> Result<&'static Function, ReadError> {
        let method = spec.method.name();
        self.abi
            .function(method)
            .and_then(|functions| functions.first())
            .ok_or(ReadError::UnknownMethod(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{MockChain, MockRaffle, raffle_address},
        types::RaffleMethod,
    };
    use alloy::{dyn_abi::DynSolValue, primitives::U256};

    fn contract(raffle: MockRaffle) -> RaffleContract {
        let address = raffle_address(1);
        let chain = MockChain::new().with_raffle(address, raffle);
        RaffleContract::new(address, Arc::new(chain))
    }

    #[tokio::test]
    async fn reads_typed_values() {
        let contract = contract(MockRaffle::active("Genesis").with_state(4));

        let name = contract.read(&CallSpec::new(RaffleMethod::Name)).await.unwrap();
        assert_eq!(name, CallValue::Text("Genesis".into()));

        let state = contract.read(&CallSpec::new(RaffleMethod::State)).await.unwrap();
        assert_eq!(state, CallValue::Uint(U256::from(4)));
    }

    #[test]
    fn rejects_unknown_arguments() {
        let contract = contract(MockRaffle::active("Genesis"));
        let spec = CallSpec::with_args(RaffleMethod::Name, vec![DynSolValue::Bool(true)]);
        assert!(matches!(contract.encode(&spec), Err(ReadError::Encode { method: "name", .. })));
    }

    #[test]
    fn rejects_short_output() {
        let contract = contract(MockRaffle::active("Genesis"));
        let data =
            DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(1), 8)]).abi_encode_params();
        assert!(contract.decode(&CallSpec::new(RaffleMethod::State), &data).is_ok());
        assert!(matches!(
            contract.decode(&CallSpec::new(RaffleMethod::State), &data[..8]),
            Err(ReadError::Decode { method: "state", .. })
        ));
    }

    #[tokio::test]
    async fn reverting_getter_is_an_rpc_error() {
        let contract = contract(MockRaffle::active("Genesis").reverting(RaffleMethod::SlotFee));
        let err = contract.read(&CallSpec::new(RaffleMethod::SlotFee)).await.unwrap_err();
        assert!(err.error_payload().is_some());
    }
}

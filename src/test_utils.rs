//! Test doubles for the remote read client.
//!
//! [`MockChain`] emulates a raffle registry, any number of raffle contracts and a Multicall3
//! deployment behind the [`ContractReader`] interface, and counts every remote call.

use crate::{
    chains::MULTICALL3_ADDRESS,
    error::ReadError,
    reader::ContractReader,
    types::{IMulticall3, RaffleMethod, raffle_abi},
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, U256, address, map::HashMap},
    rpc::json_rpc::ErrorPayload,
    sol_types::{SolCall, SolValue},
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use serde_json::value::RawValue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Address of the emulated registry.
pub const MOCK_REGISTRY: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

/// Creator of every emulated raffle.
pub const MOCK_CREATOR: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Start time of every emulated raffle.
pub const MOCK_START_TIME: u64 = 1_700_000_000;

/// A deterministic raffle address.
pub fn raffle_address(index: u64) -> Address {
    Address::left_padding_from(&(0x1000 + index).to_be_bytes())
}

/// A JSON-RPC error response.
pub fn rpc_error(code: i64, message: &str) -> ReadError {
    ReadError::Rpc(RpcError::ErrorResp(ErrorPayload {
        code,
        message: message.to_string().into(),
        data: None,
    }))
}

/// An `execution reverted` error response carrying revert data.
pub fn revert_error(data: Bytes) -> ReadError {
    let data = RawValue::from_string(format!("\"{data}\"")).expect("hex string is valid json");
    ReadError::Rpc(RpcError::ErrorResp(ErrorPayload {
        code: 3,
        message: "execution reverted".into(),
        data: Some(data),
    }))
}

/// A transport-level failure.
pub fn network_error(message: &str) -> ReadError {
    ReadError::Rpc(TransportErrorKind::custom_str(message))
}

/// How an emulated getter responds.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return the value.
    Value(DynSolValue),
    /// Fail at the transport level.
    Fail,
    /// Revert with the given data.
    Revert(Bytes),
    /// Never respond.
    Hang,
}

/// An emulated raffle contract.
#[derive(Debug, Clone)]
pub struct MockRaffle {
    getters: HashMap<RaffleMethod, MockResponse>,
}

impl MockRaffle {
    /// An active, prize-less raffle with 100 slots and one winner.
    pub fn active(name: &str) -> Self {
        use RaffleMethod::*;

        let uint = |value: u64| DynSolValue::Uint(U256::from(value), 256);
        let getters = [
            (Name, DynSolValue::String(name.to_string())),
            (Creator, DynSolValue::Address(MOCK_CREATOR)),
            (StartTime, uint(MOCK_START_TIME)),
            (Duration, uint(86_400)),
            (SlotFee, uint(10_000_000_000_000_000)),
            (SlotLimit, uint(100)),
            (WinnersCount, uint(1)),
            (MaxSlotsPerAddress, uint(10)),
            (SlotsSold, uint(0)),
            (IsPrized, DynSolValue::Bool(false)),
            (State, DynSolValue::Uint(U256::from(1), 8)),
            (PrizeCollection, DynSolValue::Address(Address::ZERO)),
            (PrizeTokenId, uint(0)),
            (Erc20PrizeToken, DynSolValue::Address(Address::ZERO)),
            (Erc20PrizeAmount, uint(0)),
            (NativePrizeAmount, uint(0)),
            (Standard, DynSolValue::Uint(U256::ZERO, 8)),
            (IsCollabPool, DynSolValue::Bool(false)),
            (UsesCustomFee, DynSolValue::Bool(false)),
            (IsEscrowedPrize, DynSolValue::Bool(false)),
            (IsExternallyPrized, DynSolValue::Bool(false)),
            (ActualDuration, uint(0)),
        ];

        Self {
            getters: getters
                .into_iter()
                .map(|(method, value)| (method, MockResponse::Value(value)))
                .collect(),
        }
    }

    /// Sets the value returned by a getter.
    pub fn with(mut self, method: RaffleMethod, value: DynSolValue) -> Self {
        self.getters.insert(method, MockResponse::Value(value));
        self
    }

    /// Sets a uint getter.
    pub fn with_uint(self, method: RaffleMethod, value: u64) -> Self {
        self.with(method, DynSolValue::Uint(U256::from(value), 256))
    }

    /// Sets the lifecycle state code.
    pub fn with_state(self, code: u8) -> Self {
        self.with(RaffleMethod::State, DynSolValue::Uint(U256::from(code), 8))
    }

    /// Makes a getter fail at the transport level.
    pub fn failing(mut self, method: RaffleMethod) -> Self {
        self.getters.insert(method, MockResponse::Fail);
        self
    }

    /// Makes a getter revert without data.
    pub fn reverting(mut self, method: RaffleMethod) -> Self {
        self.getters.insert(method, MockResponse::Revert(Bytes::new()));
        self
    }

    /// Makes a getter never respond.
    pub fn hanging(mut self, method: RaffleMethod) -> Self {
        self.getters.insert(method, MockResponse::Hang);
        self
    }

    /// Removes a getter, as on a deployment predating it.
    pub fn without(mut self, method: RaffleMethod) -> Self {
        self.getters.remove(&method);
        self
    }

    async fn respond(&self, input: &[u8]) -> Result<Bytes, ReadError> {
        let Some(method) = selector_method(input) else {
            return Err(revert_error(Bytes::new()));
        };
        match self.getters.get(&method) {
            Some(MockResponse::Value(value)) => {
                Ok(DynSolValue::Tuple(vec![value.clone()]).abi_encode_params().into())
            }
            Some(MockResponse::Fail) => Err(network_error("connection reset by peer")),
            Some(MockResponse::Revert(data)) => Err(revert_error(data.clone())),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(revert_error(Bytes::new())),
        }
    }
}

/// Resolves the getter called by `input` from its selector.
fn selector_method(input: &[u8]) -> Option<RaffleMethod> {
    let selector = input.get(..4)?;
    RaffleMethod::ALL.into_iter().find(|method| {
        raffle_abi()
            .function(method.name())
            .and_then(|functions| functions.first())
            .is_some_and(|function| function.selector().as_slice() == selector)
    })
}

/// An emulated chain.
#[derive(Debug)]
pub struct MockChain {
    registry: Address,
    registry_fails: bool,
    deployed: Vec<Address>,
    raffles: HashMap<Address, MockRaffle>,
    multicall: Option<Address>,
    multicall_fails: bool,
    block_number: u64,
    calls: AtomicUsize,
    multicalls: AtomicUsize,
}

impl MockChain {
    /// An empty chain with a registry and Multicall3.
    pub fn new() -> Self {
        Self {
            registry: MOCK_REGISTRY,
            registry_fails: false,
            deployed: Vec::new(),
            raffles: HashMap::default(),
            multicall: Some(MULTICALL3_ADDRESS),
            multicall_fails: false,
            block_number: 1,
            calls: AtomicUsize::new(0),
            multicalls: AtomicUsize::new(0),
        }
    }

    /// Deploys a raffle through the registry.
    pub fn with_raffle(mut self, address: Address, raffle: MockRaffle) -> Self {
        self.deployed.push(address);
        self.raffles.insert(address, raffle);
        self
    }

    /// Deploys `count` active raffles named `Raffle #<n>` at [`raffle_address`]`(n)`.
    pub fn with_active_raffles(self, count: u64) -> Self {
        (0..count).fold(self, |chain, index| {
            let raffle = MockRaffle::active(&format!("Raffle #{index}"));
            chain.with_raffle(raffle_address(index), raffle)
        })
    }

    /// Makes every registry read fail at the transport level.
    pub fn with_failing_registry(mut self) -> Self {
        self.registry_fails = true;
        self
    }

    /// Removes the Multicall3 deployment.
    pub fn without_multicall(mut self) -> Self {
        self.multicall = None;
        self
    }

    /// Makes every `aggregate3` call fail at the transport level.
    pub fn with_failing_multicall(mut self) -> Self {
        self.multicall_fails = true;
        self
    }

    /// Sets the current block number.
    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = block_number;
        self
    }

    /// The Multicall3 address, if deployed.
    pub fn multicall(&self) -> Option<Address> {
        self.multicall
    }

    /// Raffle addresses in deployment order.
    pub fn deployed(&self) -> &[Address] {
        &self.deployed
    }

    /// Number of remote calls issued so far, `aggregate3` counting as one.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `aggregate3` calls issued so far.
    pub fn multicalls(&self) -> usize {
        self.multicalls.load(Ordering::SeqCst)
    }

    async fn dispatch(&self, to: Address, input: &[u8]) -> Result<Bytes, ReadError> {
        if to == self.registry {
            if self.registry_fails {
                return Err(network_error("connection refused"));
            }
            return Ok((self.deployed.clone(),).abi_encode_params().into());
        }
        match self.raffles.get(&to) {
            Some(raffle) => raffle.respond(input).await,
            None => Err(revert_error(Bytes::new())),
        }
    }

    async fn aggregate3(&self, input: &[u8]) -> Result<Bytes, ReadError> {
        self.multicalls.fetch_add(1, Ordering::SeqCst);
        if self.multicall_fails {
            return Err(network_error("connection reset by peer"));
        }

        let call = IMulticall3::aggregate3Call::abi_decode(input)?;
        let mut results = Vec::with_capacity(call.calls.len());
        for call in call.calls {
            let result = match self.dispatch(call.target, &call.callData).await {
                Ok(data) => IMulticall3::Result { success: true, returnData: data },
                Err(_) => IMulticall3::Result { success: false, returnData: Bytes::new() },
            };
            results.push(result);
        }
        Ok((results,).abi_encode_params().into())
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractReader for MockChain {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if Some(to) == self.multicall {
            return self.aggregate3(&input).await;
        }
        self.dispatch(to, &input).await
    }

    async fn block_number(&self) -> Result<u64, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.block_number)
    }
}

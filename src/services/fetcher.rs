//! Per-raffle detail reads.
//!
//! A raffle is read in three getter groups, each batched through Multicall3 when the session
//! allows it and read call by call otherwise, then assembled into a [`RaffleRecord`].

use super::FetchContext;
use crate::{
    error::{ReadError, RequiredFieldError},
    reader::RaffleContract,
    types::{
        BatchEntry, CallGroup, CallSpec, CallValue, RaffleMethod, RaffleRecord, RaffleState,
        TokenStandard,
    },
};
use alloy::primitives::{Address, ChainId, U256, map::HashMap};
use tracing::{debug, instrument, trace, warn};

/// Reads and assembles the full state of single raffles.
#[derive(Debug, Clone, Copy)]
pub struct RaffleDetailFetcher<'a> {
    ctx: &'a FetchContext,
}

impl<'a> RaffleDetailFetcher<'a> {
    /// Creates a fetcher for the session.
    pub fn new(ctx: &'a FetchContext) -> Self {
        Self { ctx }
    }

    /// Fetches one raffle, or `None` if one of its required getters cannot be read.
    ///
    /// Failures of optional getters are absorbed by their fallback values.
    #[instrument(skip(self), fields(chain_id = self.ctx.chain_id))]
    pub async fn fetch(&self, address: Address) -> Option<RaffleRecord> {
        match self.try_fetch(address).await {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%address, %err, "Dropping raffle");
                None
            }
        }
    }

    /// Fetches one raffle, failing with the first required getter that cannot be read.
    pub async fn try_fetch(&self, address: Address) -> Result<RaffleRecord, RequiredFieldError> {
        let contract = RaffleContract::new(address, self.ctx.reader.clone());

        let mut fields = RaffleFields::default();
        for group in CallGroup::FETCH_ORDER {
            fields.extend(self.read_group(&contract, group).await?);
        }

        let mut record = fields.into_record(self.ctx.chain_id, address);
        if record.state.is_terminal() {
            record.actual_duration = self.read_actual_duration(&contract).await;
        }
        Ok(record)
    }

    /// Reads a group, batched unless the profile asks for progressive loading.
    ///
    /// Batching unavailable falls back to sequential reads; a failed batch disables batching
    /// for the rest of the session. Required getters that came back as fallbacks from the
    /// batch are re-read individually once.
    async fn read_group(
        &self,
        contract: &RaffleContract,
        group: CallGroup,
    ) -> Result<Vec<(RaffleMethod, CallValue)>, RequiredFieldError> {
        let specs = group.specs();

        if !self.ctx.profile().progressive_loading {
            if let Some(batch) = self.ctx.batcher.run(contract, &specs).await {
                let mut values = Vec::with_capacity(specs.len());
                for (spec, entry) in specs.iter().zip(batch) {
                    let value = match entry {
                        BatchEntry::Fallback(_) if spec.method.is_required() => {
                            debug!(method = spec.method.name(), "Re-reading required getter");
                            self.read_required(contract, spec).await?
                        }
                        entry => entry.into_value(),
                    };
                    values.push((spec.method, value));
                }
                return Ok(values);
            }
            debug!(
                ?group,
                raffle = %contract.address(),
                "Batching unavailable, reading calls individually"
            );
        }

        self.read_sequential(contract, &specs).await
    }

    async fn read_sequential(
        &self,
        contract: &RaffleContract,
        specs: &[CallSpec],
    ) -> Result<Vec<(RaffleMethod, CallValue)>, RequiredFieldError> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let value = if spec.method.is_required() {
                self.read_required(contract, spec).await?
            } else {
                self.read_one(contract, spec).await.unwrap_or_else(|err| {
                    trace!(method = spec.method.name(), %err, "Using fallback");
                    spec.method.fallback()
                })
            };
            values.push((spec.method, value));
        }
        Ok(values)
    }

    async fn read_required(
        &self,
        contract: &RaffleContract,
        spec: &CallSpec,
    ) -> Result<CallValue, RequiredFieldError> {
        self.read_one(contract, spec)
            .await
            .map_err(|source| RequiredFieldError { method: spec.method, source })
    }

    /// Reads a single getter through the retry executor.
    ///
    /// Encoding and decoding happen outside the executor and are never retried.
    async fn read_one(
        &self,
        contract: &RaffleContract,
        spec: &CallSpec,
    ) -> Result<CallValue, ReadError> {
        let input = contract.encode(spec)?;
        let context = format!("raffle.{}", spec.method.name());
        let output = self
            .ctx
            .executor
            .execute(&context, || contract.reader().call(contract.address(), input.clone()))
            .await?;
        contract.decode(spec, &output)
    }

    /// Best-effort read of the elapsed duration of a terminal raffle.
    async fn read_actual_duration(&self, contract: &RaffleContract) -> Option<u64> {
        let spec = CallSpec::new(RaffleMethod::ActualDuration);
        match self.read_one(contract, &spec).await {
            Ok(value) => value.as_uint().map(|duration| duration.saturating_to()),
            Err(err) => {
                debug!(raffle = %contract.address(), %err, "Actual duration unavailable");
                None
            }
        }
    }
}

/// Getter values of one raffle, keyed by method.
#[derive(Debug, Default)]
struct RaffleFields(HashMap<RaffleMethod, CallValue>);

impl RaffleFields {
    fn extend(&mut self, values: Vec<(RaffleMethod, CallValue)>) {
        self.0.extend(values);
    }

    fn get(&self, method: RaffleMethod) -> Option<&CallValue> {
        self.0.get(&method)
    }

    fn uint(&self, method: RaffleMethod) -> U256 {
        self.get(method).and_then(CallValue::as_uint).unwrap_or_default()
    }

    fn count(&self, method: RaffleMethod) -> u64 {
        self.uint(method).saturating_to()
    }

    fn flag(&self, method: RaffleMethod) -> bool {
        self.get(method).and_then(CallValue::as_bool).unwrap_or_default()
    }

    fn address(&self, method: RaffleMethod) -> Address {
        self.get(method).and_then(CallValue::as_address).unwrap_or_default()
    }

    fn into_record(self, chain_id: ChainId, address: Address) -> RaffleRecord {
        use RaffleMethod::*;

        let state_code: u8 = self.uint(State).saturating_to();
        let standard = self
            .get(Standard)
            .and_then(CallValue::as_uint)
            .map(|code| TokenStandard::from_code(code.saturating_to()));

        RaffleRecord {
            address,
            chain_id,
            name: self.get(Name).and_then(CallValue::as_text).unwrap_or_default().to_string(),
            creator: self.address(Creator),
            start_time: self.count(StartTime),
            duration: self.count(Duration),
            actual_duration: None,
            slot_fee: self.uint(SlotFee),
            slot_limit: self.count(SlotLimit),
            winners_count: self.count(WinnersCount),
            max_slots_per_address: self.count(MaxSlotsPerAddress),
            slots_sold: self.count(SlotsSold),
            is_prized: self.flag(IsPrized),
            prize_collection: self.address(PrizeCollection),
            prize_token_id: self.uint(PrizeTokenId),
            erc20_prize_token: self.address(Erc20PrizeToken),
            erc20_prize_amount: self.uint(Erc20PrizeAmount),
            native_prize_amount: self.uint(NativePrizeAmount),
            standard,
            state: RaffleState::from_code(state_code),
            state_code,
            is_collab_pool: self.flag(IsCollabPool),
            uses_custom_fee: self.flag(UsesCustomFee),
            is_escrowed_prize: self.get(IsEscrowedPrize).and_then(CallValue::as_bool),
            is_externally_prized: self.flag(IsExternallyPrized),
        }
    }
}

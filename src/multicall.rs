//! Multicall3 batching of raffle getter reads.
//!
//! A batch packs every call of a group into one `aggregate3` round trip with
//! `allowFailure = true`, so a single failing getter never fails its siblings. The decoded
//! [`BatchResult`] is always index-aligned with the [`CallSpec`]s it was built from: calls
//! that could not be encoded, executed or decoded take their method's fallback value.

use crate::{
    error::ReadError,
    reader::{ContractReader, RaffleContract},
    retry::RetryExecutor,
    types::{BatchEntry, BatchResult, CallSpec, IMulticall3},
};
use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, instrument, trace, warn};

/// Calls of one batch, ready to be sent.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    /// The specs the batch was built from.
    specs: Vec<CallSpec>,
    /// The encoded calls, without the dropped specs.
    calls: Vec<IMulticall3::Call3>,
    /// Position in `calls` of every spec, `None` if the spec was dropped.
    slots: Vec<Option<usize>>,
}

impl EncodedBatch {
    /// Number of specs the batch was built from.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the batch was built from no specs.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The calls sent to the helper.
    pub fn calls(&self) -> &[IMulticall3::Call3] {
        &self.calls
    }

    /// Number of specs dropped while encoding.
    pub fn dropped(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }
}

/// Multicall3 batch coordinator for a single chain.
///
/// Once a batch fails after retries the batcher is disabled for the rest of the session,
/// clones included.
#[derive(Debug, Clone)]
pub struct MulticallBatcher {
    reader: Arc<dyn ContractReader>,
    multicall: Option<Address>,
    executor: RetryExecutor,
    disabled: Arc<AtomicBool>,
}

impl MulticallBatcher {
    /// Create a new batcher. Without a helper address batching is unavailable.
    pub fn new(
        reader: Arc<dyn ContractReader>,
        multicall: Option<Address>,
        executor: RetryExecutor,
    ) -> Self {
        Self { reader, multicall, executor, disabled: Arc::default() }
    }

    /// Whether the chain has a Multicall3 helper that has not failed yet.
    pub fn is_available(&self) -> bool {
        self.multicall.is_some() && !self.disabled.load(Ordering::Relaxed)
    }

    /// Stops batching for the rest of the session.
    fn disable(&self) {
        if !self.disabled.swap(true, Ordering::Relaxed) {
            debug!("Disabling Multicall3 batching for the session");
        }
    }

    /// Encodes `specs` against the contract's ABI.
    ///
    /// Specs whose method is missing from the ABI or whose arguments do not encode are
    /// dropped from the outgoing calls; their index is remembered so the decoded result
    /// stays aligned.
    pub fn encode(contract: &RaffleContract, specs: &[CallSpec]) -> EncodedBatch {
        let mut calls = Vec::with_capacity(specs.len());
        let slots = specs
            .iter()
            .map(|spec| match contract.encode(spec) {
                Ok(call_data) => {
                    calls.push(IMulticall3::Call3 {
                        target: contract.address(),
                        allowFailure: true,
                        callData: call_data,
                    });
                    Some(calls.len() - 1)
                }
                Err(err) => {
                    trace!(raffle = %contract.address(), %err, "Dropping call from batch");
                    None
                }
            })
            .collect();

        EncodedBatch { specs: specs.to_vec(), calls, slots }
    }

    /// Sends the batch through the helper.
    ///
    /// Returns `None` if batching is unavailable, the call still fails after retries, or the
    /// helper returns a different number of results than calls sent. The last two disable
    /// the batcher.
    #[instrument(skip_all, fields(calls = batch.calls.len()))]
    pub async fn execute(&self, batch: &EncodedBatch) -> Option<Vec<IMulticall3::Result>> {
        let Some(multicall) = self.multicall else {
            debug!("Multicall3 unavailable on chain");
            return None;
        };
        if self.disabled.load(Ordering::Relaxed) {
            trace!("Multicall3 disabled for the session");
            return None;
        }
        if batch.calls.is_empty() {
            return Some(Vec::new());
        }

        let input: Bytes =
            IMulticall3::aggregate3Call { calls: batch.calls.clone() }.abi_encode().into();
        let reader = &self.reader;
        let results = self
            .executor
            .execute("multicall.aggregate3", || {
                let input = input.clone();
                async move {
                    let output = reader.call(multicall, input).await?;
                    Ok::<_, ReadError>(IMulticall3::aggregate3Call::abi_decode_returns(&output)?)
                }
            })
            .await;

        match results {
            Ok(results) if results.len() == batch.calls.len() => Some(results),
            Ok(results) => {
                warn!(
                    expected = batch.calls.len(),
                    received = results.len(),
                    "Multicall3 returned unexpected number of results"
                );
                self.disable();
                None
            }
            Err(err) => {
                warn!(%err, "Multicall3 batch failed");
                self.disable();
                None
            }
        }
    }

    /// Decodes the helper's results into a [`BatchResult`] aligned with the batch's specs.
    pub fn decode(
        contract: &RaffleContract,
        batch: &EncodedBatch,
        results: &[IMulticall3::Result],
    ) -> BatchResult {
        batch
            .specs
            .iter()
            .zip(&batch.slots)
            .map(|(spec, slot)| {
                let result = slot.and_then(|position| results.get(position));
                let decoded = match result {
                    Some(result) if result.success => contract
                        .decode(spec, &result.returnData)
                        .inspect_err(|err| trace!(%err, "Falling back for undecodable result"))
                        .ok(),
                    _ => None,
                };
                match decoded {
                    Some(value) => BatchEntry::Decoded(value),
                    None => BatchEntry::Fallback(spec.method.fallback()),
                }
            })
            .collect()
    }

    /// Encodes, executes and decodes `specs` in one round trip.
    ///
    /// `None` means batching is unavailable and the caller should read the calls
    /// individually.
    pub async fn run(&self, contract: &RaffleContract, specs: &[CallSpec]) -> Option<BatchResult> {
        let batch = Self::encode(contract, specs);
        let results = self.execute(&batch).await?;
        let decoded = Self::decode(contract, &batch, &results);
        debug!(
            raffle = %contract.address(),
            calls = batch.len(),
            dropped = batch.dropped(),
            fallbacks = decoded.iter().filter(|entry| entry.is_fallback()).count(),
            "Decoded multicall batch"
        );
        Some(decoded)
    }
}

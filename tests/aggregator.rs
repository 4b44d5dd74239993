//! End-to-end fetches against an emulated chain.

use alloy::primitives::ChainId;
use raffle_aggregator::{
    aggregator::{FetchOptions, RaffleAggregator},
    chains::{ChainHandle, Chains},
    error::{AggregatorError, ErrorClass},
    platform::{PlatformClass, PlatformHint},
    test_utils::{MOCK_REGISTRY, MockChain, MockRaffle, raffle_address},
    types::{RaffleMethod, RaffleState},
};
use std::sync::{Arc, Mutex};

const CHAIN_ID: ChainId = 31337;

fn aggregator(chain: &Arc<MockChain>) -> RaffleAggregator {
    let handle = ChainHandle::new(CHAIN_ID, chain.clone())
        .with_registry(MOCK_REGISTRY)
        .with_multicall(chain.multicall());
    RaffleAggregator::new(Chains::new([handle]))
}

#[tokio::test(start_paused = true)]
async fn cached_refetch_issues_no_calls() {
    let chain = Arc::new(MockChain::new().with_active_raffles(6));
    let aggregator = aggregator(&chain);
    let hint = PlatformHint::unconstrained();

    let first = aggregator.fetch_raffles(CHAIN_ID, &hint, FetchOptions::default()).await.unwrap();
    let calls = chain.calls();
    assert_eq!(first.len(), 6);

    let second = aggregator.fetch_raffles(CHAIN_ID, &hint, FetchOptions::default()).await.unwrap();
    assert_eq!(chain.calls(), calls);
    assert_eq!(second, first);

    let stats = aggregator.cache().stats();
    assert_eq!(stats.metrics.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn raffles_are_newest_first() {
    let chain = Arc::new(MockChain::new().with_active_raffles(3));
    let aggregator = aggregator(&chain);

    let records = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap();

    let addresses: Vec<_> = records.iter().map(|record| record.address).collect();
    assert_eq!(addresses, vec![raffle_address(2), raffle_address(1), raffle_address(0)]);
    assert!(records.iter().all(|record| record.chain_id == CHAIN_ID));
    assert_eq!(records[0].name, "Raffle #2");
}

#[tokio::test(start_paused = true)]
async fn broken_raffle_does_not_fail_the_batch() {
    let mut chain = MockChain::new();
    for index in 0..10 {
        let raffle = MockRaffle::active(&format!("Raffle #{index}"));
        let raffle = if index == 4 { raffle.failing(RaffleMethod::Creator) } else { raffle };
        chain = chain.with_raffle(raffle_address(index), raffle);
    }
    let chain = Arc::new(chain);
    let aggregator = aggregator(&chain);

    let records = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 9);
    assert!(records.iter().all(|record| record.address != raffle_address(4)));
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_complete() {
    let chain = Arc::new(MockChain::new().with_active_raffles(5));
    let aggregator = aggregator(&chain);

    for hint in [PlatformHint::constrained(), PlatformHint::unconstrained()] {
        let progress = Mutex::new(Vec::new());
        let options = FetchOptions::default()
            .no_cache()
            .with_progress(|done, total| progress.lock().unwrap().push((done, total)));
        aggregator.fetch_raffles(CHAIN_ID, &hint, options).await.unwrap();

        let progress = progress.into_inner().unwrap();
        assert!(progress.windows(2).all(|pair| pair[0].0 <= pair[1].0), "{progress:?}");
        assert_eq!(progress.last(), Some(&(5, 5)));
        if hint.class() == PlatformClass::Constrained {
            assert_eq!(progress.len(), 5);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn constrained_fetch_is_capped() {
    let chain = Arc::new(MockChain::new().with_active_raffles(25));
    let aggregator = aggregator(&chain);

    let records = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::constrained(), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 20);
    assert_eq!(records.first().map(|record| record.address), Some(raffle_address(24)));
    assert_eq!(records.last().map(|record| record.address), Some(raffle_address(5)));
    assert_eq!(chain.multicalls(), 0);

    // collections are cached per platform class
    let desktop = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(desktop.len(), 25);
    assert_eq!(aggregator.cache().stats().collections, 2);
}

#[tokio::test(start_paused = true)]
async fn terminal_raffles_carry_actual_duration() {
    let finished = MockRaffle::active("Finished")
        .with_state(4)
        .with_uint(RaffleMethod::ActualDuration, 3_600);
    let chain = Arc::new(
        MockChain::new()
            .with_raffle(raffle_address(0), finished)
            .with_raffle(raffle_address(1), MockRaffle::active("Running")),
    );
    let aggregator = aggregator(&chain);

    let records = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records[0].state, RaffleState::Active);
    assert_eq!(records[0].actual_duration, None);
    assert_eq!(records[1].state, RaffleState::Completed);
    assert_eq!(records[1].actual_duration, Some(3_600));
}

#[tokio::test(start_paused = true)]
async fn discovery_failure_fails_the_fetch() {
    let chain = Arc::new(MockChain::new().with_active_raffles(3).with_failing_registry());
    let aggregator = aggregator(&chain);

    let err = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::AddressDiscoveryFailed { chain_id: CHAIN_ID, .. }));
    assert!(err.is_discovery_failure());
    assert_eq!(err.class(), Some(ErrorClass::Network));
    assert_eq!(aggregator.cache().stats().collections, 0);

    let stats = aggregator
        .metrics()
        .get("registry.getAllRaffles", PlatformClass::Unconstrained)
        .unwrap();
    assert_eq!(stats.calls, 3);
    assert_eq!(stats.errors, 3);
}

#[tokio::test]
async fn chain_without_registry() {
    let chain = Arc::new(MockChain::new().with_active_raffles(3));
    let handle = ChainHandle::new(CHAIN_ID, chain.clone());
    let aggregator = RaffleAggregator::new(Chains::new([handle]));

    let err = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::ContractsNotAvailable(CHAIN_ID)));
    assert!(err.is_discovery_failure());
    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn unknown_chain() {
    let chain = Arc::new(MockChain::new());
    let aggregator = aggregator(&chain);

    let err = aggregator
        .fetch_raffles(1, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AggregatorError::UnsupportedChain(1)));
    assert_eq!(err.class(), None);
}

#[tokio::test(start_paused = true)]
async fn empty_registry_is_an_empty_collection() {
    let chain = Arc::new(MockChain::new());
    let aggregator = aggregator(&chain);

    let records = aggregator
        .fetch_raffles(CHAIN_ID, &PlatformHint::unconstrained(), FetchOptions::default())
        .await
        .unwrap();
    assert!(records.is_empty());
}

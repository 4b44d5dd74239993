//! Contract bindings for the raffle registry and raffle instances.

use super::RaffleMethod;
use alloy::{json_abi::JsonAbi, sol};
use std::sync::LazyLock;

sol! {
    /// The registry (factory) every raffle is deployed through.
    interface IRaffleRegistry {
        /// Returns every registered raffle, oldest first.
        function getAllRaffles() external view returns (address[] memory);
    }
}

static RAFFLE_ABI: LazyLock<JsonAbi> = LazyLock::new(|| {
    JsonAbi::parse(RaffleMethod::ALL.iter().map(|method| method.signature()))
        .expect("raffle getter signatures are valid")
});

/// The ABI of the current raffle contract, covering every [`RaffleMethod`].
///
/// Older deployments expose a subset of these getters; callers fetching such raffles pass
/// their own [`JsonAbi`] instead.
pub fn raffle_abi() -> &'static JsonAbi {
    &RAFFLE_ABI
}

//! Normalized raffle snapshots.

use alloy::primitives::{Address, ChainId, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse lifecycle phase of a raffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RaffleState {
    /// Deployed, not yet open.
    Pending,
    /// Open for slot purchases.
    Active,
    /// Waiting for winner selection.
    Drawing,
    /// Winners selected.
    Completed,
    /// Closed without further activity.
    Ended,
}

impl RaffleState {
    /// Maps the on-chain state code.
    ///
    /// Codes outside the known table are treated as [`RaffleState::Ended`].
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Active,
            2 => Self::Ended,
            3 => Self::Drawing,
            4 => Self::Completed,
            5 => Self::Ended,
            _ => Self::Ended,
        }
    }

    /// Whether the raffle will not accept further participation.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Drawing | Self::Completed | Self::Ended)
    }

    /// Lowercase name of the state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Drawing => "drawing",
            Self::Completed => "completed",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token standard of the prize collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenStandard {
    Erc721,
    Erc1155,
    Erc20,
    /// A code this crate does not know.
    Other(u8),
}

impl TokenStandard {
    /// Maps the on-chain standard id.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Erc721,
            1 => Self::Erc1155,
            2 => Self::Erc20,
            other => Self::Other(other),
        }
    }
}

/// Snapshot of one raffle's on-chain state at fetch time.
///
/// Records are built fresh on every fetch and never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleRecord {
    /// The raffle contract.
    pub address: Address,
    /// The chain the raffle lives on.
    pub chain_id: ChainId,
    /// Display name.
    pub name: String,
    /// Account that deployed the raffle.
    pub creator: Address,
    /// Start of the raffle, unix seconds.
    pub start_time: u64,
    /// Scheduled duration in seconds.
    pub duration: u64,
    /// Elapsed duration reported by the contract, only read for terminal states.
    pub actual_duration: Option<u64>,
    /// Price of a single slot in wei.
    pub slot_fee: U256,
    /// Total number of slots.
    pub slot_limit: u64,
    /// Number of winners drawn.
    pub winners_count: u64,
    /// Upper bound of slots a single address may hold.
    pub max_slots_per_address: u64,
    /// Slots purchased so far.
    pub slots_sold: u64,
    /// Whether the raffle distributes a prize.
    pub is_prized: bool,
    /// NFT collection of the prize, zero if none.
    pub prize_collection: Address,
    /// Token id of the prize within the collection.
    pub prize_token_id: U256,
    /// ERC-20 prize token, zero if none.
    pub erc20_prize_token: Address,
    /// ERC-20 prize amount.
    pub erc20_prize_amount: U256,
    /// Native currency prize amount in wei.
    pub native_prize_amount: U256,
    /// Token standard of the prize collection, `None` if the contract does not report one.
    pub standard: Option<TokenStandard>,
    /// Lifecycle phase.
    pub state: RaffleState,
    /// Raw on-chain state code.
    pub state_code: u8,
    /// Whether the pool is collaborative.
    pub is_collab_pool: bool,
    /// Whether the creator set a custom protocol fee.
    pub uses_custom_fee: bool,
    /// Whether the prize is escrowed by the contract, `None` if unknown.
    pub is_escrowed_prize: Option<bool>,
    /// Whether the prize comes from an external (refundable) collection.
    pub is_externally_prized: bool,
}

impl RaffleRecord {
    /// Whether the raffle carries any prize.
    pub fn has_prize(&self) -> bool {
        self.is_prized
            || !self.prize_collection.is_zero()
            || !self.erc20_prize_amount.is_zero()
            || !self.native_prize_amount.is_zero()
    }

    /// End of the scheduled window, unix seconds.
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_table() {
        let expected = [
            (0, "pending"),
            (1, "active"),
            (2, "ended"),
            (3, "drawing"),
            (4, "completed"),
            (5, "ended"),
        ];
        for (code, name) in expected {
            assert_eq!(RaffleState::from_code(code).as_str(), name, "code {code}");
        }
        assert_eq!(RaffleState::from_code(99), RaffleState::Ended);
        assert_eq!(RaffleState::from_code(u8::MAX), RaffleState::Ended);
    }

    #[test]
    fn terminal_states() {
        assert!(!RaffleState::Pending.is_terminal());
        assert!(!RaffleState::Active.is_terminal());
        assert!(RaffleState::Drawing.is_terminal());
        assert!(RaffleState::Completed.is_terminal());
        assert!(RaffleState::Ended.is_terminal());
    }

    #[test]
    fn token_standards() {
        assert_eq!(TokenStandard::from_code(0), TokenStandard::Erc721);
        assert_eq!(TokenStandard::from_code(1), TokenStandard::Erc1155);
        assert_eq!(TokenStandard::from_code(7), TokenStandard::Other(7));
    }
}

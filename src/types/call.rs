//! Typed read calls against a raffle contract.
//!
//! Every getter the aggregator reads is a [`RaffleMethod`]. The method carries its ABI
//! signature, the group it is fetched with, the shape of its result and the fallback value
//! used when the call cannot be encoded, executed or decoded.

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use serde::{Deserialize, Serialize};

/// The logical group a getter is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallGroup {
    /// Identity, schedule, limits and lifecycle state.
    Core,
    /// Prize configuration.
    Prize,
    /// Pool configuration flags.
    Config,
    /// Only read once the raffle reached a terminal state.
    Terminal,
}

impl CallGroup {
    /// The groups of a detail fetch, in execution order.
    pub const FETCH_ORDER: [Self; 3] = [Self::Core, Self::Prize, Self::Config];

    /// The methods belonging to this group, in call order.
    pub fn methods(self) -> &'static [RaffleMethod] {
        use RaffleMethod::*;
        match self {
            Self::Core => &[
                Name,
                Creator,
                StartTime,
                Duration,
                SlotFee,
                SlotLimit,
                WinnersCount,
                MaxSlotsPerAddress,
                SlotsSold,
                IsPrized,
                State,
            ],
            Self::Prize => &[
                PrizeCollection,
                PrizeTokenId,
                Erc20PrizeToken,
                Erc20PrizeAmount,
                NativePrizeAmount,
                Standard,
            ],
            Self::Config => &[IsCollabPool, UsesCustomFee, IsEscrowedPrize, IsExternallyPrized],
            Self::Terminal => &[ActualDuration],
        }
    }

    /// Builds the call specs of this group.
    pub fn specs(self) -> Vec<CallSpec> {
        self.methods().iter().map(|method| CallSpec::new(*method)).collect()
    }
}

/// The shape of a getter's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `bool`
    Bool,
    /// `address`
    Address,
    /// Any `uintN`.
    Uint,
    /// `string`
    Text,
}

/// A getter exposed by raffle contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RaffleMethod {
    Name,
    Creator,
    StartTime,
    Duration,
    SlotFee,
    SlotLimit,
    WinnersCount,
    MaxSlotsPerAddress,
    SlotsSold,
    IsPrized,
    State,
    PrizeCollection,
    PrizeTokenId,
    Erc20PrizeToken,
    Erc20PrizeAmount,
    NativePrizeAmount,
    Standard,
    IsCollabPool,
    UsesCustomFee,
    IsEscrowedPrize,
    IsExternallyPrized,
    ActualDuration,
}

impl RaffleMethod {
    /// Every known getter.
    pub const ALL: [Self; 22] = [
        Self::Name,
        Self::Creator,
        Self::StartTime,
        Self::Duration,
        Self::SlotFee,
        Self::SlotLimit,
        Self::WinnersCount,
        Self::MaxSlotsPerAddress,
        Self::SlotsSold,
        Self::IsPrized,
        Self::State,
        Self::PrizeCollection,
        Self::PrizeTokenId,
        Self::Erc20PrizeToken,
        Self::Erc20PrizeAmount,
        Self::NativePrizeAmount,
        Self::Standard,
        Self::IsCollabPool,
        Self::UsesCustomFee,
        Self::IsEscrowedPrize,
        Self::IsExternallyPrized,
        Self::ActualDuration,
    ];

    /// The Solidity function name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Creator => "creator",
            Self::StartTime => "startTime",
            Self::Duration => "duration",
            Self::SlotFee => "slotFee",
            Self::SlotLimit => "slotLimit",
            Self::WinnersCount => "winnersCount",
            Self::MaxSlotsPerAddress => "maxSlotsPerAddress",
            Self::SlotsSold => "totalSlotsPurchased",
            Self::IsPrized => "isPrized",
            Self::State => "state",
            Self::PrizeCollection => "prizeCollection",
            Self::PrizeTokenId => "prizeTokenId",
            Self::Erc20PrizeToken => "erc20PrizeToken",
            Self::Erc20PrizeAmount => "erc20PrizeAmount",
            Self::NativePrizeAmount => "nativePrizeAmount",
            Self::Standard => "standardId",
            Self::IsCollabPool => "isCollabPool",
            Self::UsesCustomFee => "usesCustomFee",
            Self::IsEscrowedPrize => "isEscrowedPrize",
            Self::IsExternallyPrized => "isExternallyPrized",
            Self::ActualDuration => "getActualRaffleDuration",
        }
    }

    /// Human-readable ABI signature of the getter.
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Name => "function name() view returns (string)",
            Self::Creator => "function creator() view returns (address)",
            Self::StartTime => "function startTime() view returns (uint256)",
            Self::Duration => "function duration() view returns (uint256)",
            Self::SlotFee => "function slotFee() view returns (uint256)",
            Self::SlotLimit => "function slotLimit() view returns (uint256)",
            Self::WinnersCount => "function winnersCount() view returns (uint256)",
            Self::MaxSlotsPerAddress => "function maxSlotsPerAddress() view returns (uint256)",
            Self::SlotsSold => "function totalSlotsPurchased() view returns (uint256)",
            Self::IsPrized => "function isPrized() view returns (bool)",
            Self::State => "function state() view returns (uint8)",
            Self::PrizeCollection => "function prizeCollection() view returns (address)",
            Self::PrizeTokenId => "function prizeTokenId() view returns (uint256)",
            Self::Erc20PrizeToken => "function erc20PrizeToken() view returns (address)",
            Self::Erc20PrizeAmount => "function erc20PrizeAmount() view returns (uint256)",
            Self::NativePrizeAmount => "function nativePrizeAmount() view returns (uint256)",
            Self::Standard => "function standardId() view returns (uint8)",
            Self::IsCollabPool => "function isCollabPool() view returns (bool)",
            Self::UsesCustomFee => "function usesCustomFee() view returns (bool)",
            Self::IsEscrowedPrize => "function isEscrowedPrize() view returns (bool)",
            Self::IsExternallyPrized => "function isExternallyPrized() view returns (bool)",
            Self::ActualDuration => "function getActualRaffleDuration() view returns (uint256)",
        }
    }

    /// The group this getter is fetched with.
    pub fn group(self) -> CallGroup {
        match self {
            Self::ActualDuration => CallGroup::Terminal,
            method => CallGroup::FETCH_ORDER
                .into_iter()
                .find(|group| group.methods().contains(&method))
                .unwrap_or(CallGroup::Config),
        }
    }

    /// The shape of the getter's return value.
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Name => ValueKind::Text,
            Self::Creator | Self::PrizeCollection | Self::Erc20PrizeToken => ValueKind::Address,
            Self::IsPrized
            | Self::IsCollabPool
            | Self::UsesCustomFee
            | Self::IsEscrowedPrize
            | Self::IsExternallyPrized => ValueKind::Bool,
            Self::StartTime
            | Self::Duration
            | Self::SlotFee
            | Self::SlotLimit
            | Self::WinnersCount
            | Self::MaxSlotsPerAddress
            | Self::SlotsSold
            | Self::State
            | Self::PrizeTokenId
            | Self::Erc20PrizeAmount
            | Self::NativePrizeAmount
            | Self::Standard
            | Self::ActualDuration => ValueKind::Uint,
        }
    }

    /// Whether a raffle can be assembled without this value.
    ///
    /// A required getter that cannot be read drops the raffle from the result set.
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            Self::Name
                | Self::Creator
                | Self::StartTime
                | Self::Duration
                | Self::SlotLimit
                | Self::WinnersCount
                | Self::State
        )
    }

    /// The value substituted when the call is dropped, fails or cannot be decoded.
    ///
    /// Getters whose absence carries meaning (older deployments without escrow support or
    /// without a token standard) fall back to [`CallValue::Missing`] rather than a zero value.
    pub fn fallback(self) -> CallValue {
        match self {
            Self::IsEscrowedPrize | Self::Standard => CallValue::Missing,
            method => match method.kind() {
                ValueKind::Bool => CallValue::Bool(false),
                ValueKind::Address => CallValue::Address(Address::ZERO),
                ValueKind::Uint => CallValue::Uint(U256::ZERO),
                ValueKind::Text => CallValue::Text(String::new()),
            },
        }
    }
}

/// A single read call: a method and its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    /// The getter to call.
    pub method: RaffleMethod,
    /// Arguments passed to the getter.
    pub args: Vec<DynSolValue>,
}

impl CallSpec {
    /// A call without arguments.
    pub fn new(method: RaffleMethod) -> Self {
        Self { method, args: Vec::new() }
    }

    /// A call with arguments.
    pub fn with_args(method: RaffleMethod, args: Vec<DynSolValue>) -> Self {
        Self { method, args }
    }
}

/// A decoded getter result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum CallValue {
    Bool(bool),
    Address(Address),
    Uint(U256),
    Text(String),
    /// The value is unknown; distinct from `false` or zero.
    Missing,
}

impl CallValue {
    /// Converts the first decoded output of a getter into a typed value.
    ///
    /// Returns `None` if the value does not have the expected shape.
    pub fn from_dyn(kind: ValueKind, value: DynSolValue) -> Option<Self> {
        match (kind, value) {
            (ValueKind::Bool, DynSolValue::Bool(value)) => Some(Self::Bool(value)),
            (ValueKind::Address, DynSolValue::Address(value)) => Some(Self::Address(value)),
            (ValueKind::Uint, DynSolValue::Uint(value, _)) => Some(Self::Uint(value)),
            (ValueKind::Text, DynSolValue::String(value)) => Some(Self::Text(value)),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the address, if this is one.
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this is the [`CallValue::Missing`] sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// One slot of a [`BatchResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    /// The call succeeded and decoded.
    Decoded(CallValue),
    /// The call was dropped, failed or did not decode; holds the method's fallback.
    Fallback(CallValue),
}

impl BatchEntry {
    /// The decoded or substituted value.
    pub fn value(&self) -> &CallValue {
        match self {
            Self::Decoded(value) | Self::Fallback(value) => value,
        }
    }

    /// Consumes the entry, returning the value.
    pub fn into_value(self) -> CallValue {
        match self {
            Self::Decoded(value) | Self::Fallback(value) => value,
        }
    }

    /// Whether the value is a substituted fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Results of a batch, index-aligned with the [`CallSpec`]s that produced it.
pub type BatchResult = Vec<BatchEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_belongs_to_exactly_one_group() {
        for method in RaffleMethod::ALL {
            let groups = [CallGroup::Core, CallGroup::Prize, CallGroup::Config, CallGroup::Terminal]
                .into_iter()
                .filter(|group| group.methods().contains(&method))
                .count();
            assert_eq!(groups, 1, "{method:?}");
            assert!(method.group().methods().contains(&method));
        }
    }

    #[test]
    fn fallback_table() {
        assert_eq!(RaffleMethod::IsPrized.fallback(), CallValue::Bool(false));
        assert_eq!(RaffleMethod::IsCollabPool.fallback(), CallValue::Bool(false));
        assert_eq!(RaffleMethod::PrizeCollection.fallback(), CallValue::Address(Address::ZERO));
        assert_eq!(RaffleMethod::Erc20PrizeAmount.fallback(), CallValue::Uint(U256::ZERO));
        assert_eq!(RaffleMethod::NativePrizeAmount.fallback(), CallValue::Uint(U256::ZERO));
        assert_eq!(RaffleMethod::IsEscrowedPrize.fallback(), CallValue::Missing);
        assert_eq!(RaffleMethod::Standard.fallback(), CallValue::Missing);
    }

    #[test]
    fn from_dyn_rejects_mismatched_shapes() {
        assert_eq!(
            CallValue::from_dyn(ValueKind::Uint, DynSolValue::Uint(U256::from(7), 8)),
            Some(CallValue::Uint(U256::from(7)))
        );
        assert_eq!(CallValue::from_dyn(ValueKind::Bool, DynSolValue::Uint(U256::ZERO, 256)), None);
        assert_eq!(CallValue::from_dyn(ValueKind::Text, DynSolValue::Bool(true)), None);
    }

    #[test]
    fn required_getters_are_core() {
        for method in RaffleMethod::ALL.into_iter().filter(|m| m.is_required()) {
            assert_eq!(method.group(), CallGroup::Core, "{method:?}");
        }
    }
}

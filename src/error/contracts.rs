use alloy::sol_types::SolError;

alloy::sol! {
    /// Custom errors raised by raffle contracts when a business rule rejects a call.
    #[derive(Debug)]
    contract RaffleErrors {
        error ExceedsMaxSlots();
        error IncorrectPayment();
        error NotAWinner();
        error DurationElapsed();
        error RaffleNotActive();
        error PrizeAlreadyClaimed();
        error InvalidState();
    }
}

/// A known business-rule rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessRule {
    /// The custom error name.
    pub name: &'static str,
    /// The 4-byte selector of the custom error.
    pub selector: [u8; 4],
    /// Lowercase phrase used by string reverts for the same rule.
    pub phrase: &'static str,
}

/// Every business-rule error the classifier recognizes.
pub const BUSINESS_RULES: &[BusinessRule] = &[
    BusinessRule {
        name: "ExceedsMaxSlots",
        selector: <RaffleErrors::ExceedsMaxSlots as SolError>::SELECTOR,
        phrase: "exceeds limit",
    },
    BusinessRule {
        name: "IncorrectPayment",
        selector: <RaffleErrors::IncorrectPayment as SolError>::SELECTOR,
        phrase: "incorrect payment",
    },
    BusinessRule {
        name: "NotAWinner",
        selector: <RaffleErrors::NotAWinner as SolError>::SELECTOR,
        phrase: "not a winner",
    },
    BusinessRule {
        name: "DurationElapsed",
        selector: <RaffleErrors::DurationElapsed as SolError>::SELECTOR,
        phrase: "duration elapsed",
    },
    BusinessRule {
        name: "RaffleNotActive",
        selector: <RaffleErrors::RaffleNotActive as SolError>::SELECTOR,
        phrase: "raffle not active",
    },
    BusinessRule {
        name: "PrizeAlreadyClaimed",
        selector: <RaffleErrors::PrizeAlreadyClaimed as SolError>::SELECTOR,
        phrase: "prize already claimed",
    },
    BusinessRule {
        name: "InvalidState",
        selector: <RaffleErrors::InvalidState as SolError>::SELECTOR,
        phrase: "invalid state",
    },
];

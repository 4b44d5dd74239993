//! Shared primitive types.

mod call;
pub use call::*;

mod contracts;
pub use contracts::*;

mod multicall;
pub use multicall::*;

mod raffle;
pub use raffle::*;

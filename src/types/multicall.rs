//! Multicall3 contract interface for batching multiple calls.

use alloy::sol;

sol! {
    /// Multicall3 interface, deployed at the same address on every supported chain.
    interface IMulticall3 {
        /// Represents a single call in a multicall batch
        #[derive(Debug, PartialEq, Eq)]
        struct Call3 {
            /// Target contract address
            address target;
            /// Whether to allow this call to fail
            bool allowFailure;
            /// Encoded function call data
            bytes callData;
        }

        /// Result of a single call in aggregate3
        #[derive(Debug, PartialEq, Eq)]
        struct Result {
            /// Whether the call was successful
            bool success;
            /// The return data from the call
            bytes returnData;
        }

        /// Execute multiple calls in a single transaction
        function aggregate3(Call3[] calldata calls)
            external
            payable
            returns (Result[] memory returnData);
    }
}

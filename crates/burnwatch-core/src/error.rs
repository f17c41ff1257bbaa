//! Error types for chain reads, verification, subscription and the watch loop.

use alloy_primitives::Address;
use burnwatch_rpc_core::TransportError;
use thiserror::Error;

/// A failed chain read.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("cannot decode {method} result: {reason}")]
    Decode { method: String, reason: String },
}

/// Why a transaction is not an LP burn.
///
/// Every variant is a rejection of one log; none is fatal to the watch loop.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("transaction not found")]
    NotFound,

    #[error("transaction is pending")]
    Pending,

    #[error("contract creation has no target pool")]
    ContractCreation,

    #[error("calldata too short: {len} bytes")]
    CalldataTooShort { len: usize },

    #[error("selector 0x{selector} is not transfer(address,uint256)")]
    SelectorMismatch { selector: String },

    #[error("{pool} is not an LP token (name {name:?})")]
    NotUniswapPool { pool: Address, name: String },

    #[error("cannot decode transfer arguments: {0}")]
    TransferDecode(String),

    #[error("recipient {recipient} is not the dead address")]
    RecipientNotDead { recipient: Address },

    #[error("pair {token0}/{token1} has no single non-wrapped-native side")]
    AmbiguousPair { token0: Address, token1: Address },

    #[error("{what} lookup failed: {source}")]
    Lookup {
        what: &'static str,
        #[source]
        source: ChainError,
    },

    #[error("pool {pool} query failed: {source}")]
    PoolQuery {
        pool: Address,
        #[source]
        source: ChainError,
    },
}

impl VerifyError {
    /// Returns `true` when the rejection came from a failed read rather than
    /// from the transaction itself.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::Lookup { .. } | Self::PoolQuery { .. })
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("eth_subscribe failed: {0}")]
    Subscribe(#[source] TransportError),

    #[error("subscription {id} closed")]
    Closed { id: String },
}

/// Terminal failure of the watch loop.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("log subscription failed: {0}")]
    Subscription(#[from] SubscriptionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_are_flagged() {
        let err = VerifyError::PoolQuery {
            pool: Address::ZERO,
            source: ChainError::Abi("boom".into()),
        };
        assert!(err.is_lookup_failure());
        assert!(!VerifyError::Pending.is_lookup_failure());
        assert!(err.to_string().contains("boom"));
    }
}

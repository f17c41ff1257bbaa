//! Data carried through the burn-detection pipeline.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Deserializer};

/// A `Transfer` log delivered by the `logs` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLog {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "quantity")]
    pub block_number: u64,
    /// The contract that emitted the log.
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    /// Set when the log was dropped by a chain reorganisation.
    #[serde(default)]
    pub removed: bool,
}

/// The subset of `eth_getTransactionByHash` the verifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub hash: B256,
    /// `None` for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
    /// `None` while the transaction is pending.
    #[serde(default, deserialize_with = "optional_quantity")]
    pub block_number: Option<u64>,
}

/// A transaction that passed the selector, pool-name and recipient checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBurn {
    pub transaction_hash: B256,
    /// The LP token contract the transaction was sent to.
    pub pool_address: Address,
    pub recipient: Address,
    /// Raw LP amount, 18 implied decimals.
    pub amount: U256,
}

/// Pool state read at verification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub name: String,
    pub token0: Address,
    pub token1: Address,
    pub total_supply: U256,
}

/// Underlying-token reads. `None` marks a failed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
    /// Tokens held by the token contract itself.
    pub balance_held_by_self: Option<U256>,
}

/// A confirmed LP burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBurn {
    pub candidate: CandidateBurn,
    pub pool: PoolInfo,
    /// The non-WETH side of the pair.
    pub underlying_token: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BurnMetrics {
    /// Burned LP amount in whole LP units.
    pub burned_amount: f64,
    pub burn_percentage: f64,
    /// Underlying tokens held by the token contract, in whole units.
    pub clogged_amount: f64,
    pub clogged_percentage: f64,
}

fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    U64::deserialize(deserializer).map(|q| q.to::<u64>())
}

fn optional_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<U64>::deserialize(deserializer).map(|q| q.map(|q| q.to::<u64>()))
}

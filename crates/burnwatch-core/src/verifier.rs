//! LP burn verification.
//!
//! A dead-address `Transfer` log only becomes a burn once its transaction is
//! shown to be a direct `transfer(dead, amount)` call on a Uniswap V2 LP
//! token. Checks run cheapest first and stop at the first failure:
//!
//! 1. transaction is known and mined
//! 2. calldata starts with `transfer(address,uint256)`
//! 3. target contract's `name()` carries the LP marker
//! 4. transfer arguments decode
//! 5. recipient is the dead address
//! 6. pool `totalSupply()`, `token0()`, `token1()` are readable
//! 7. exactly one side of the pair is the wrapped native token

use std::sync::Arc;

use alloy_primitives::{address, Address, B256};

use crate::abi::TRANSFER_SELECTOR;
use crate::chain::ContractReader;
use crate::error::{ChainError, VerifyError};
use crate::types::{CandidateBurn, PoolInfo, VerifiedBurn};

/// Mainnet WETH.
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const DEAD_ADDRESS: Address = address!("000000000000000000000000000000000000dEaD");

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub dead_address: Address,
    pub wrapped_native: Address,
    /// Case-sensitive substring an LP token's `name()` must contain.
    pub lp_name_marker: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            dead_address: DEAD_ADDRESS,
            wrapped_native: WETH,
            lp_name_marker: "Uniswap".into(),
        }
    }
}

pub struct BurnVerifier {
    contracts: Arc<ContractReader>,
    config: VerifierConfig,
}

impl BurnVerifier {
    pub fn new(contracts: Arc<ContractReader>, config: VerifierConfig) -> Self {
        Self { contracts, config }
    }

    /// Verify that `tx_hash` is an LP burn.
    pub async fn verify(&self, tx_hash: B256) -> Result<VerifiedBurn, VerifyError> {
        let tx = self
            .contracts
            .chain()
            .transaction(tx_hash)
            .await
            .map_err(|source| VerifyError::Lookup {
                what: "transaction",
                source,
            })?
            .ok_or(VerifyError::NotFound)?;
        if tx.block_number.is_none() {
            return Err(VerifyError::Pending);
        }

        let input = tx.input.as_ref();
        if input.len() < 4 {
            return Err(VerifyError::CalldataTooShort { len: input.len() });
        }
        if input[..4] != TRANSFER_SELECTOR {
            return Err(VerifyError::SelectorMismatch {
                selector: hex::encode(&input[..4]),
            });
        }

        let pool = tx.to.ok_or(VerifyError::ContractCreation)?;
        let name = self
            .contracts
            .name(pool)
            .await
            .map_err(|source| VerifyError::Lookup {
                what: "pool name",
                source,
            })?;
        if !name.contains(&self.config.lp_name_marker) {
            return Err(VerifyError::NotUniswapPool { pool, name });
        }

        let (recipient, amount) = self
            .contracts
            .abi()
            .decode_transfer(&input[4..])
            .map_err(|e| VerifyError::TransferDecode(e.to_string()))?;
        if recipient != self.config.dead_address {
            return Err(VerifyError::RecipientNotDead { recipient });
        }

        let pool_info = self
            .pool_info(pool, name)
            .await
            .map_err(|source| VerifyError::PoolQuery { pool, source })?;
        let underlying_token = self.select_underlying(&pool_info)?;

        tracing::debug!(
            tx = %tx_hash,
            pool = %pool,
            token = %underlying_token,
            amount = %amount,
            "verified LP burn"
        );

        Ok(VerifiedBurn {
            candidate: CandidateBurn {
                transaction_hash: tx_hash,
                pool_address: pool,
                recipient,
                amount,
            },
            pool: pool_info,
            underlying_token,
        })
    }

    async fn pool_info(&self, pool: Address, name: String) -> Result<PoolInfo, ChainError> {
        let total_supply = self.contracts.total_supply(pool).await?;
        let token0 = self.contracts.token0(pool).await?;
        let token1 = self.contracts.token1(pool).await?;
        Ok(PoolInfo {
            name,
            token0,
            token1,
            total_supply,
        })
    }

    /// Pick the non-wrapped-native side of the pair.
    pub fn select_underlying(&self, pool: &PoolInfo) -> Result<Address, VerifyError> {
        let weth = self.config.wrapped_native;
        match (pool.token0 == weth, pool.token1 == weth) {
            (true, false) => Ok(pool.token1),
            (false, true) => Ok(pool.token0),
            _ => Err(VerifyError::AmbiguousPair {
                token0: pool.token0,
                token1: pool.token1,
            }),
        }
    }
}

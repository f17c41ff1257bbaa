//! Burn and clog metrics.
//!
//! Raw 256-bit amounts are rendered as exact decimal strings before the
//! conversion to `f64`, so large supplies keep their leading digits.
//! A failed read never aborts the computation: the affected figures fall
//! back to zero.

use std::sync::Arc;

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};

use crate::chain::ContractReader;
use crate::types::{BurnMetrics, TokenInfo, VerifiedBurn};

/// Decimals of every Uniswap V2 LP token.
pub const LP_DECIMALS: u8 = 18;

pub struct BurnCalculator {
    contracts: Arc<ContractReader>,
}

impl BurnCalculator {
    pub fn new(contracts: Arc<ContractReader>) -> Self {
        Self { contracts }
    }

    /// Read decimals, supply and self-held balance of `token`.
    pub async fn token_info(&self, token: Address) -> TokenInfo {
        let decimals = self
            .contracts
            .decimals(token)
            .await
            .map_err(|e| tracing::warn!(token = %token, error = %e, "decimals() failed"))
            .ok();
        let total_supply = self
            .contracts
            .total_supply(token)
            .await
            .map_err(|e| tracing::warn!(token = %token, error = %e, "totalSupply() failed"))
            .ok();
        let balance_held_by_self = self
            .contracts
            .balance_of(token, token)
            .await
            .map_err(|e| tracing::warn!(token = %token, error = %e, "balanceOf(self) failed"))
            .ok();

        TokenInfo {
            address: token,
            decimals,
            total_supply,
            balance_held_by_self,
        }
    }

    /// Read the underlying token and compute metrics for `burn`.
    pub async fn calculate(&self, burn: &VerifiedBurn) -> (TokenInfo, BurnMetrics) {
        let token = self.token_info(burn.underlying_token).await;
        let metrics = burn_metrics(burn, &token);
        (token, metrics)
    }
}

/// Compute metrics from already-read values.
pub fn burn_metrics(burn: &VerifiedBurn, token: &TokenInfo) -> BurnMetrics {
    let burned_amount = normalize(burn.candidate.amount, LP_DECIMALS).unwrap_or_default();
    let lp_supply = normalize(burn.pool.total_supply, LP_DECIMALS).unwrap_or_default();

    let (clogged_amount, clogged_percentage) = match token.decimals {
        Some(decimals) => {
            let held = token
                .balance_held_by_self
                .and_then(|b| normalize(b, decimals))
                .unwrap_or_default();
            let supply = token
                .total_supply
                .and_then(|s| normalize(s, decimals))
                .unwrap_or_default();
            (held, percentage(held, supply))
        }
        None => (0.0, 0.0),
    };

    BurnMetrics {
        burned_amount,
        burn_percentage: percentage(lp_supply, burned_amount),
        clogged_amount,
        clogged_percentage,
    }
}

/// `amount / 10^decimals` as `f64`. `None` if `decimals` is not a valid unit.
pub fn normalize(amount: U256, decimals: u8) -> Option<f64> {
    format_units(amount, decimals).ok()?.parse().ok()
}

/// `part / whole * 100`, or zero when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_scales_by_decimals() {
        let one_and_half = U256::from(1_500_000u64);
        assert_eq!(normalize(one_and_half, 6), Some(1.5));
        assert_eq!(normalize(U256::ZERO, 18), Some(0.0));
    }

    #[test]
    fn normalize_keeps_magnitude_of_max_supply() {
        let n = normalize(U256::MAX, 18).unwrap();
        let expected = 1.157920892373162e59;
        assert!((n - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn normalize_rejects_absurd_decimals() {
        assert_eq!(normalize(U256::from(1u64), 200), None);
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, 100.0), 5.0);
    }
}

//! Best-effort off-chain enrichment.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::EnrichError;
use crate::price::PoolPrice;
use crate::security::TokenSecurity;

#[async_trait]
pub trait TokenSecuritySource: Send + Sync {
    async fn token_security(&self, token: Address) -> Result<TokenSecurity, EnrichError>;
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Market data for the pool's base token.
    async fn pool_price(&self, pool: Address) -> Result<PoolPrice, EnrichError>;
}

/// Enrichment results. Failed lookups hold placeholder values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub security: TokenSecurity,
    pub price: PoolPrice,
    /// Set when either lookup failed.
    pub degraded: bool,
}

pub struct Enricher {
    security: Arc<dyn TokenSecuritySource>,
    price: Arc<dyn PriceSource>,
}

impl Enricher {
    pub fn new(security: Arc<dyn TokenSecuritySource>, price: Arc<dyn PriceSource>) -> Self {
        Self { security, price }
    }

    /// Look up `token` security and `pool` price concurrently.
    pub async fn enrich(&self, token: Address, pool: Address) -> Enrichment {
        let (security, price) = tokio::join!(
            self.security.token_security(token),
            self.price.pool_price(pool)
        );

        let mut degraded = false;
        let security = security.unwrap_or_else(|e| {
            tracing::warn!(token = %token, error = %e, "token security lookup failed");
            degraded = true;
            TokenSecurity::default()
        });
        let price = price.unwrap_or_else(|e| {
            tracing::warn!(pool = %pool, error = %e, "price lookup failed");
            degraded = true;
            PoolPrice::default()
        });

        Enrichment {
            security,
            price,
            degraded,
        }
    }
}

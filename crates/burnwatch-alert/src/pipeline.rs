//! verify → metrics → enrich → format → notify, for one transaction.

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use burnwatch_core::metrics::normalize;
use burnwatch_core::{
    BurnCalculator, BurnVerifier, LogHandler, TokenInfo, TransferLog, VerifyError,
};

use crate::enrichment::Enricher;
use crate::error::PipelineError;
use crate::formatter::{AlertFormatter, BurnReport};
use crate::notifier::Notifier;

/// What happened to one transaction.
#[derive(Debug)]
pub enum BurnOutcome {
    Rejected(VerifyError),
    Alerted(Box<BurnReport>),
}

pub struct BurnAlertPipeline {
    verifier: BurnVerifier,
    calculator: BurnCalculator,
    enricher: Enricher,
    formatter: AlertFormatter,
    notifier: Arc<dyn Notifier>,
}

impl BurnAlertPipeline {
    pub fn new(
        verifier: BurnVerifier,
        calculator: BurnCalculator,
        enricher: Enricher,
        formatter: AlertFormatter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            verifier,
            calculator,
            enricher,
            formatter,
            notifier,
        }
    }

    /// Run the whole pipeline for `tx_hash`.
    ///
    /// Rejections and degraded lookups are not errors; only a failed delivery is.
    pub async fn process(&self, tx_hash: B256) -> Result<BurnOutcome, PipelineError> {
        let burn = match self.verifier.verify(tx_hash).await {
            Ok(burn) => burn,
            Err(e) => {
                if e.is_lookup_failure() {
                    tracing::warn!(tx = %tx_hash, reason = %e, "not an LP burn");
                } else {
                    tracing::info!(tx = %tx_hash, reason = %e, "not an LP burn");
                }
                return Ok(BurnOutcome::Rejected(e));
            }
        };

        let (token, metrics) = self.calculator.calculate(&burn).await;
        let enrichment = self
            .enricher
            .enrich(burn.underlying_token, burn.candidate.pool_address)
            .await;
        let market_cap = market_cap(enrichment.price.price_usd, &token);

        tracing::info!(
            tx = %tx_hash,
            pool = %burn.candidate.pool_address,
            token = %burn.underlying_token,
            burned = metrics.burned_amount,
            burn_pct = metrics.burn_percentage,
            clog_pct = metrics.clogged_percentage,
            degraded = enrichment.degraded,
            "LP burn detected"
        );

        let report = BurnReport {
            burn,
            token,
            metrics,
            enrichment,
            market_cap,
        };
        let message = self.formatter.format(&report);
        self.notifier.notify(&message).await?;

        Ok(BurnOutcome::Alerted(Box::new(report)))
    }
}

#[async_trait]
impl LogHandler for BurnAlertPipeline {
    type Error = PipelineError;

    async fn handle(&self, log: &TransferLog) -> Result<(), PipelineError> {
        self.process(log.transaction_hash).await.map(|_| ())
    }
}

/// `floor(price × supply / 10^decimals)`, zero when supply or decimals are
/// unknown.
pub fn market_cap(price_usd: f64, token: &TokenInfo) -> u64 {
    let supply = token
        .total_supply
        .zip(token.decimals)
        .and_then(|(supply, decimals)| normalize(supply, decimals));
    match supply {
        Some(supply) if price_usd > 0.0 => (price_usd * supply).floor() as u64,
        _ => 0,
    }
}

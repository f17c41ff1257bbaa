//! The seam between the watch loop and burn processing.

use async_trait::async_trait;

use crate::types::TransferLog;

/// Processes one dead-address transfer log.
///
/// Errors are reported by the watch loop and never stop it.
#[async_trait]
pub trait LogHandler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, log: &TransferLog) -> Result<(), Self::Error>;
}

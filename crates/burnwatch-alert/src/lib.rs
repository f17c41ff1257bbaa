//! burnwatch-alert: turns a verified LP burn into a delivered alert.
//!
//! ```text
//! VerifiedBurn ─► metrics ─► enrichment (security + price, best effort)
//!                               └─► formatter ─► notifier (Telegram | log)
//! ```

pub mod enrichment;
pub mod error;
pub mod formatter;
pub mod notifier;
pub mod pipeline;
pub mod price;
pub mod security;

pub use enrichment::{Enricher, Enrichment, PriceSource, TokenSecuritySource};
pub use error::{EnrichError, NotifyError, PipelineError};
pub use formatter::{AlertFormatter, BurnReport};
pub use notifier::{LogNotifier, Notifier, TelegramConfig, TelegramNotifier};
pub use pipeline::{market_cap, BurnAlertPipeline, BurnOutcome};
pub use price::{GeckoTerminalClient, PoolPrice};
pub use security::{GoPlusClient, Holder, TokenSecurity};

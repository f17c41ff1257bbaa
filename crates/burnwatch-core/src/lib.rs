//! burnwatch-core: Uniswap V2 LP burn detection.
//!
//! Watches `Transfer` logs whose recipient is the dead address, verifies
//! that the originating transaction is an LP-token `transfer` into the dead
//! address, and computes burn and clog percentages.
//!
//! # Pipeline
//! ```text
//! subscriber ──► watcher ──► LogHandler
//!                              ├─ verifier  (tx ► selector ► pool name ► decode ► pool tokens)
//!                              └─ metrics   (burn %, clog %)
//! ```

pub mod abi;
pub mod chain;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod subscriber;
pub mod types;
pub mod verifier;
pub mod watcher;

pub use abi::{transfer_topic, ContractAbi, TRANSFER_SELECTOR};
pub use chain::{ChainReader, ContractReader, RpcChainReader};
pub use error::{ChainError, SubscriptionError, VerifyError, WatchError};
pub use handler::LogHandler;
pub use metrics::BurnCalculator;
pub use subscriber::{dead_transfer_filter, subscribe_dead_transfers, TransferLogStream};
pub use types::{
    BurnMetrics, CandidateBurn, ChainTransaction, PoolInfo, TokenInfo, TransferLog, VerifiedBurn,
};
pub use verifier::{BurnVerifier, VerifierConfig};
pub use watcher::watch;

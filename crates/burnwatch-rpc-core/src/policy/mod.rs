//! Reliability policies applied around a transport.
//!
//! ```text
//! Request → [Retrying: deadline + backoff] → [Transport]
//! ```

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy, Retrying};

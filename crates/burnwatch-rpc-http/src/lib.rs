//! burnwatch-rpc-http: JSON-RPC over HTTP, backed by `reqwest`.
//!
//! The client performs exactly one POST per request; wrap it in
//! [`burnwatch_rpc_core::Retrying`] for deadlines and backoff.

pub mod client;

pub use client::{HttpClientConfig, HttpRpcClient};

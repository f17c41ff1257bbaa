//! burnwatch-rpc-ws: WebSocket JSON-RPC transport.
//!
//! # Features
//! - Request multiplexing over a single connection
//! - `eth_subscribe` notification routing
//! - Reconnect with exponential backoff, bounded by `max_reconnect_attempts`
//! - Resubscribe after reconnect, re-keyed to the node's new subscription IDs

pub mod client;
pub mod subscriptions;

pub use client::{WsClientConfig, WsRpcClient};
pub use subscriptions::SubscriptionManager;

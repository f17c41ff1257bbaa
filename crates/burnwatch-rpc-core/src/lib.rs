//! burnwatch-rpc-core: foundation traits and types for the burnwatch RPC layer.
//!
//! # Overview
//!
//! - [`RpcTransport`]: the async trait every transport (HTTP, WebSocket) implements
//! - [`RpcCallExt`]: typed `call` helper available on every transport
//! - [`PubSubTransport`]: transports that push `eth_subscription` notifications
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`]: structured error type
//! - [`policy`]: retry with exponential backoff and per-call deadlines

pub mod error;
pub mod policy;
pub mod request;
pub mod transport;

pub use error::TransportError;
pub use policy::{RetryConfig, RetryPolicy, Retrying};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, RpcParam};
pub use transport::{HealthStatus, PubSubTransport, RpcCallExt, RpcTransport, SubscriptionId};

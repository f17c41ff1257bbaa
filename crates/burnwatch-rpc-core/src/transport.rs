//! Transport traits shared by the HTTP and WebSocket clients.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Connection state as last observed by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Connected.
    Healthy,
    /// Lost the connection and trying to get it back.
    Degraded,
    /// Gave up; every request now fails.
    Unhealthy,
    /// The transport does not track connection state (HTTP).
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Request/response access to a node.
///
/// Object safe: chain readers hold an `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send `req` and wait for the matching reply.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    fn health(&self) -> HealthStatus {
        HealthStatus::Unknown
    }

    /// Endpoint, for logging.
    fn url(&self) -> &str;
}

/// `call` with a deserialized result, for any transport including trait objects.
#[async_trait]
pub trait RpcCallExt: RpcTransport {
    async fn call<T: DeserializeOwned + Send>(
        &self,
        id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest::new(id, method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}

impl<T: RpcTransport + ?Sized> RpcCallExt for T {}

/// Node-assigned `eth_subscribe` handle. Changes on every resubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transport that can push `eth_subscription` notifications.
///
/// The returned receiver yields each notification's `result` payload and
/// closes when the transport permanently loses the subscription.
#[async_trait]
pub trait PubSubTransport: RpcTransport {
    async fn subscribe(
        &self,
        kind: &str,
        params: Vec<Value>,
    ) -> Result<(SubscriptionId, mpsc::UnboundedReceiver<Value>), TransportError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for std::sync::Arc<T> {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        (**self).send(req).await
    }

    fn health(&self) -> HealthStatus {
        (**self).health()
    }

    fn url(&self) -> &str {
        (**self).url()
    }
}

//! One JSON-RPC call per HTTP POST.

use std::time::Duration;

use async_trait::async_trait;

use burnwatch_rpc_core::error::TransportError;
use burnwatch_rpc_core::request::{JsonRpcRequest, JsonRpcResponse};
use burnwatch_rpc_core::transport::RpcTransport;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Upper bound on connect, send and read for a single POST.
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Sends `eth_call` and `eth_getTransactionByHash` requests over HTTP(S).
pub struct HttpRpcClient {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpRpcClient {
    pub fn new(endpoint: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("building HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

fn http_error(e: reqwest::Error) -> TransportError {
    TransportError::Http(e.to_string())
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(endpoint = %self.endpoint, method = %req.method, id = %req.id, "POST");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(http_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(http_error)?;

        if !status.is_success() {
            return Err(TransportError::Http(format!("status {status}: {body}")));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn url(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_can_be_retried() {
        let client = HttpRpcClient::new(
            "http://127.0.0.1:9",
            HttpClientConfig {
                request_timeout: Duration::from_millis(500),
            },
        )
        .unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:9");

        let err = client
            .send(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
        assert!(err.is_retryable());
    }
}

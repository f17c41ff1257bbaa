//! WebSocket JSON-RPC client with reconnect and subscription management.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use burnwatch_rpc_core::error::TransportError;
use burnwatch_rpc_core::request::{JsonRpcRequest, JsonRpcResponse, RpcId};
use burnwatch_rpc_core::transport::{HealthStatus, PubSubTransport, RpcTransport, SubscriptionId};

use crate::subscriptions::SubscriptionManager;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type CallReply = oneshot::Sender<Result<JsonRpcResponse, TransportError>>;
type SubscribeReply =
    oneshot::Sender<Result<(SubscriptionId, mpsc::UnboundedReceiver<Value>), TransportError>>;

/// Configuration for the WebSocket client.
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Delay before the first reconnect attempt.
    pub reconnect_initial: Duration,
    /// Maximum reconnect backoff.
    pub reconnect_max: Duration,
    /// Reconnect attempts before giving up; `0` closes on the first disconnect.
    pub max_reconnect_attempts: u32,
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
            max_reconnect_attempts: 10,
        }
    }
}

enum Outgoing {
    Call { req: JsonRpcRequest, tx: CallReply },
    Subscribe { kind: String, params: Vec<Value>, tx: SubscribeReply },
}

impl Outgoing {
    fn fail(self, err: TransportError) {
        match self {
            Self::Call { tx, .. } => {
                let _ = tx.send(Err(err));
            }
            Self::Subscribe { tx, .. } => {
                let _ = tx.send(Err(err));
            }
        }
    }
}

enum WsCommand {
    Request(Outgoing),
    Close,
}

/// A request on the wire awaiting its response, keyed by wire ID.
enum Pending {
    Call { caller_id: RpcId, tx: CallReply },
    Subscribe { kind: String, params: Vec<Value>, tx: SubscribeReply },
    Resubscribe { previous: SubscriptionId },
}

impl Pending {
    fn fail(self, reason: &str) {
        match self {
            Self::Call { tx, .. } => {
                let _ = tx.send(Err(TransportError::WebSocket(reason.to_string())));
            }
            Self::Subscribe { tx, .. } => {
                let _ = tx.send(Err(TransportError::WebSocket(reason.to_string())));
            }
            Self::Resubscribe { .. } => {}
        }
    }
}

#[derive(Default)]
struct HealthCell(AtomicU8);

impl HealthCell {
    fn set(&self, status: HealthStatus) {
        let raw = match status {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
            HealthStatus::Unknown => 3,
        };
        self.0.store(raw, Ordering::Relaxed);
    }

    fn get(&self) -> HealthStatus {
        match self.0.load(Ordering::Relaxed) {
            0 => HealthStatus::Healthy,
            1 => HealthStatus::Degraded,
            2 => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}

/// WebSocket JSON-RPC client.
///
/// A background task owns the connection. Caller request IDs are swapped
/// for connection-unique wire IDs and restored on the response, so callers
/// may reuse IDs freely.
pub struct WsRpcClient {
    url: String,
    cmd_tx: mpsc::UnboundedSender<WsCommand>,
    health: Arc<HealthCell>,
}

impl WsRpcClient {
    /// Connect to `url` and start the background task.
    ///
    /// The first connection attempt is not retried.
    pub async fn connect(
        url: impl Into<String>,
        config: WsClientConfig,
    ) -> Result<Self, TransportError> {
        let url = url.into();
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::WebSocket(format!("connect {url}: {e}")))?;
        tracing::info!(url = %url, "WebSocket connected");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let health = Arc::new(HealthCell::default());
        health.set(HealthStatus::Healthy);

        let task = WsTask {
            url: url.clone(),
            config,
            subscriptions: SubscriptionManager::new(),
            pending: HashMap::new(),
            next_wire_id: 0,
            health: Arc::clone(&health),
        };
        tokio::spawn(task.run(ws, cmd_rx));

        Ok(Self { url, cmd_tx, health })
    }

    fn submit(&self, outgoing: Outgoing) -> Result<(), TransportError> {
        self.cmd_tx
            .send(WsCommand::Request(outgoing))
            .map_err(|_| TransportError::Closed(format!("WebSocket task for {} has stopped", self.url)))
    }
}

impl Drop for WsRpcClient {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(WsCommand::Close);
    }
}

#[async_trait]
impl RpcTransport for WsRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Outgoing::Call { req, tx })?;
        rx.await
            .map_err(|_| TransportError::Closed("WebSocket response dropped".into()))?
    }

    fn health(&self) -> HealthStatus {
        self.health.get()
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PubSubTransport for WsRpcClient {
    async fn subscribe(
        &self,
        kind: &str,
        params: Vec<Value>,
    ) -> Result<(SubscriptionId, mpsc::UnboundedReceiver<Value>), TransportError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Outgoing::Subscribe {
            kind: kind.to_string(),
            params,
            tx,
        })?;
        rx.await
            .map_err(|_| TransportError::Closed("WebSocket subscribe reply dropped".into()))?
    }
}

enum ConnectionEnd {
    Shutdown,
    Lost,
}

enum Reconnect {
    Connected(WsStream),
    Shutdown,
    GaveUp,
}

struct WsTask {
    url: String,
    config: WsClientConfig,
    subscriptions: SubscriptionManager,
    pending: HashMap<u64, Pending>,
    next_wire_id: u64,
    health: Arc<HealthCell>,
}

impl WsTask {
    async fn run(mut self, mut ws: WsStream, mut cmd_rx: mpsc::UnboundedReceiver<WsCommand>) {
        let mut resubscribe = false;
        loop {
            self.health.set(HealthStatus::Healthy);
            if let ConnectionEnd::Shutdown = self.drive(ws, &mut cmd_rx, resubscribe).await {
                tracing::debug!(url = %self.url, "WebSocket client closed");
                return;
            }
            self.fail_pending("connection lost");
            self.log_delivery_gap();

            match self.reconnect(&mut cmd_rx).await {
                Reconnect::Connected(next) => {
                    ws = next;
                    resubscribe = true;
                }
                Reconnect::Shutdown => return,
                Reconnect::GaveUp => {
                    tracing::error!(
                        url = %self.url,
                        attempts = self.config.max_reconnect_attempts,
                        subscriptions = self.subscriptions.len(),
                        "giving up on WebSocket reconnect"
                    );
                    self.health.set(HealthStatus::Unhealthy);
                    self.subscriptions.clear();
                    return;
                }
            }
        }
    }

    /// Serve one connection until it drops or the client shuts down.
    async fn drive(
        &mut self,
        ws: WsStream,
        cmd_rx: &mut mpsc::UnboundedReceiver<WsCommand>,
        resubscribe: bool,
    ) -> ConnectionEnd {
        let (mut sink, mut stream) = ws.split();
        if resubscribe {
            self.resubscribe(&mut sink).await;
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(WsCommand::Close) => {
                        let _ = sink.send(Message::Close(None)).await;
                        return ConnectionEnd::Shutdown;
                    }
                    Some(WsCommand::Request(outgoing)) => {
                        if !self.write_request(outgoing, &mut sink).await {
                            return ConnectionEnd::Lost;
                        }
                    }
                },
                msg = stream.next() => match msg {
                    None => return ConnectionEnd::Lost,
                    Some(Err(e)) => {
                        tracing::warn!(url = %self.url, error = %e, "WebSocket receive error");
                        return ConnectionEnd::Lost;
                    }
                    Some(Ok(Message::Text(text))) => self.handle_message(text.as_str()),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(url = %self.url, "WebSocket closed by server");
                        return ConnectionEnd::Lost;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_wire_id += 1;
        self.next_wire_id
    }

    /// Returns `false` if the connection rejected the write.
    async fn write_request(&mut self, outgoing: Outgoing, sink: &mut WsSink) -> bool {
        let wire_id = self.next_id();
        let (req, pending) = match outgoing {
            Outgoing::Call { mut req, tx } => {
                let caller_id = std::mem::replace(&mut req.id, RpcId::Number(wire_id));
                (req, Pending::Call { caller_id, tx })
            }
            Outgoing::Subscribe { kind, params, tx } => {
                let req = subscribe_request(wire_id, &kind, &params);
                (req, Pending::Subscribe { kind, params, tx })
            }
        };

        let text = match serde_json::to_string(&req) {
            Ok(text) => text,
            Err(e) => {
                pending.fail(&format!("request encoding failed: {e}"));
                return true;
            }
        };
        self.pending.insert(wire_id, pending);
        sink.send(Message::Text(text.into())).await.is_ok()
    }

    async fn resubscribe(&mut self, sink: &mut WsSink) {
        for (previous, kind, params) in self.subscriptions.active_subscriptions() {
            let wire_id = self.next_id();
            let req = subscribe_request(wire_id, &kind, &params);
            let text = match serde_json::to_string(&req) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(subscription = %previous, error = %e, "cannot encode resubscribe");
                    continue;
                }
            };
            self.pending.insert(wire_id, Pending::Resubscribe { previous });
            if sink.send(Message::Text(text.into())).await.is_err() {
                tracing::warn!(url = %self.url, "connection dropped while resubscribing");
                return;
            }
        }
    }

    fn handle_message(&mut self, text: &str) {
        let Ok(val) = serde_json::from_str::<Value>(text) else {
            tracing::debug!("failed to parse WS message as JSON");
            return;
        };

        if val.get("method").and_then(Value::as_str) == Some("eth_subscription") {
            let params = &val["params"];
            if let Some(id) = params["subscription"].as_str() {
                let id = SubscriptionId(id.to_string());
                if !self.subscriptions.dispatch(&id, params["result"].clone()) {
                    tracing::debug!(subscription = %id, "notification for unknown subscription");
                }
            }
            return;
        }

        let resp: JsonRpcResponse = match serde_json::from_value(val) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(error = %e, "unrecognised WS message");
                return;
            }
        };
        let Some(pending) = resp.id.as_number().and_then(|id| self.pending.remove(&id)) else {
            return;
        };

        match pending {
            Pending::Call { caller_id, tx } => {
                let mut resp = resp;
                resp.id = caller_id;
                let _ = tx.send(Ok(resp));
            }
            Pending::Subscribe { kind, params, tx } => {
                let reply = subscription_id(resp).map(|id| {
                    let rx = self.subscriptions.register(id.clone(), kind, params);
                    (id, rx)
                });
                let _ = tx.send(reply);
            }
            Pending::Resubscribe { previous } => match subscription_id(resp) {
                Ok(id) => {
                    tracing::warn!(
                        previous = %previous,
                        current = %id,
                        last_block = ?self.subscriptions.last_block(&previous),
                        "resubscribed; notifications emitted while disconnected were not delivered"
                    );
                    self.subscriptions.rekey(&previous, id);
                }
                Err(e) => {
                    tracing::warn!(subscription = %previous, error = %e, "resubscribe rejected, dropping subscription");
                    self.subscriptions.remove(&previous);
                }
            },
        }
    }

    /// The node does not replay notifications missed between disconnect and
    /// resubscribe.
    fn log_delivery_gap(&self) {
        for (id, kind, _) in self.subscriptions.active_subscriptions() {
            tracing::warn!(
                url = %self.url,
                subscription = %id,
                kind = %kind,
                last_block = ?self.subscriptions.last_block(&id),
                "connection lost; notifications after last_block may be missed"
            );
        }
    }

    fn fail_pending(&mut self, reason: &str) {
        for (_, pending) in self.pending.drain() {
            pending.fail(reason);
        }
    }

    /// Reconnect with exponential backoff. Requests arriving while
    /// disconnected fail immediately with a retryable error.
    async fn reconnect(&mut self, cmd_rx: &mut mpsc::UnboundedReceiver<WsCommand>) -> Reconnect {
        self.health.set(HealthStatus::Degraded);
        let mut backoff = self.config.reconnect_initial;

        for attempt in 1..=self.config.max_reconnect_attempts {
            tracing::warn!(
                url = %self.url,
                attempt,
                delay_ms = backoff.as_millis() as u64,
                "WebSocket disconnected, reconnecting"
            );

            let sleep = time::sleep(backoff);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    cmd = cmd_rx.recv() => match cmd {
                        None | Some(WsCommand::Close) => return Reconnect::Shutdown,
                        Some(WsCommand::Request(outgoing)) => {
                            outgoing.fail(TransportError::WebSocket("reconnecting".into()));
                        }
                    },
                }
            }

            match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    tracing::info!(url = %self.url, attempt, "WebSocket reconnected");
                    return Reconnect::Connected(ws);
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, attempt, error = %e, "reconnect failed");
                    backoff = (backoff * 2).min(self.config.reconnect_max);
                }
            }
        }

        Reconnect::GaveUp
    }
}

fn subscribe_request(id: u64, kind: &str, params: &[Value]) -> JsonRpcRequest {
    let params = std::iter::once(Value::String(kind.to_string()))
        .chain(params.iter().cloned())
        .collect();
    JsonRpcRequest::new(id, "eth_subscribe", params)
}

fn subscription_id(resp: JsonRpcResponse) -> Result<SubscriptionId, TransportError> {
    let value = resp.into_result().map_err(TransportError::Rpc)?;
    value
        .as_str()
        .map(|s| SubscriptionId(s.to_string()))
        .ok_or_else(|| TransportError::Other(format!("unexpected eth_subscribe result: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    type ServerWs = WebSocketStream<TcpStream>;

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (tcp, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(tcp).await.unwrap()
    }

    async fn next_request(ws: &mut ServerWs) -> Value {
        loop {
            if let Message::Text(text) = ws.next().await.unwrap().unwrap() {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn push(ws: &mut ServerWs, value: Value) {
        ws.send(Message::Text(value.to_string().into())).await.unwrap();
    }

    async fn reply(ws: &mut ServerWs, id: &Value, result: Value) {
        push(ws, json!({"jsonrpc": "2.0", "id": id, "result": result})).await;
    }

    async fn notify(ws: &mut ServerWs, subscription: &str, result: Value) {
        push(
            ws,
            json!({
                "jsonrpc": "2.0",
                "method": "eth_subscription",
                "params": {"subscription": subscription, "result": result}
            }),
        )
        .await;
    }

    fn fast_reconnect(max_reconnect_attempts: u32) -> WsClientConfig {
        WsClientConfig {
            reconnect_initial: Duration::from_millis(10),
            reconnect_max: Duration::from_millis(50),
            max_reconnect_attempts,
        }
    }

    #[test]
    fn subscribe_request_prepends_kind() {
        let req = subscribe_request(3, "logs", &[json!({"topics": []})]);
        assert_eq!(req.method, "eth_subscribe");
        assert_eq!(req.params[0], json!("logs"));
        assert_eq!(req.params[1], json!({"topics": []}));
    }

    #[tokio::test]
    async fn caller_ids_are_restored() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let req = next_request(&mut ws).await;
            assert_eq!(req["method"], "eth_blockNumber");
            reply(&mut ws, &req["id"], json!("0x10")).await;
            let _ = ws.next().await;
        });

        let client = WsRpcClient::connect(&url, WsClientConfig::default()).await.unwrap();
        let resp = client
            .send(JsonRpcRequest::new(42, "eth_blockNumber", vec![]))
            .await
            .unwrap();
        assert_eq!(resp.id, RpcId::Number(42));
        assert_eq!(resp.into_result().unwrap(), json!("0x10"));
        assert_eq!(client.health(), HealthStatus::Healthy);

        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn subscription_survives_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let req = next_request(&mut ws).await;
            assert_eq!(req["method"], "eth_subscribe");
            reply(&mut ws, &req["id"], json!("0xsub1")).await;
            notify(&mut ws, "0xsub1", json!({"n": 1})).await;
            drop(ws);

            let mut ws = accept(&listener).await;
            let req = next_request(&mut ws).await;
            assert_eq!(req["params"][0], "logs");
            assert_eq!(req["params"][1], json!({"topics": []}));
            reply(&mut ws, &req["id"], json!("0xsub2")).await;
            notify(&mut ws, "0xsub2", json!({"n": 2})).await;
            let _ = ws.next().await;
        });

        let client = WsRpcClient::connect(&url, fast_reconnect(5)).await.unwrap();
        let (id, mut rx) = client.subscribe("logs", vec![json!({"topics": []})]).await.unwrap();
        assert_eq!(id, SubscriptionId("0xsub1".into()));

        let first = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(first, Some(json!({"n": 1})));
        let second = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(second, Some(json!({"n": 2})));

        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn subscription_closes_when_reconnect_gives_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let req = next_request(&mut ws).await;
            reply(&mut ws, &req["id"], json!("0xsub")).await;
            // Dropping both the socket and the listener refuses every reconnect.
        });

        let client = WsRpcClient::connect(&url, fast_reconnect(2)).await.unwrap();
        let (_, mut rx) = client.subscribe("logs", vec![]).await.unwrap();
        server.await.unwrap();

        let closed = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(closed.is_none());
        assert_eq!(client.health(), HealthStatus::Unhealthy);

        let err = client
            .send(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));
    }
}

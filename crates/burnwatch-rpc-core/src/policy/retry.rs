//! Exponential backoff retry with a per-attempt deadline.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::{HealthStatus, RpcTransport};

/// Backoff settings for [`Retrying`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Each delay is scaled by a random factor in
    /// `1 ± jitter_fraction` (0.0 = no jitter).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

/// Delay schedule derived from a [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Wait before retry number `attempt` (starting at 1); `None` once the
    /// budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        let RetryConfig {
            max_retries,
            initial_backoff,
            max_backoff,
            multiplier,
            jitter_fraction,
        } = &self.config;
        if !(1..=*max_retries).contains(&attempt) {
            return None;
        }
        let grown = initial_backoff.as_secs_f64() * multiplier.powi(attempt as i32 - 1);
        let spread = jitter_fraction * (2.0 * rand::random::<f64>() - 1.0);
        let delay = grown.min(max_backoff.as_secs_f64()) * (1.0 + spread);
        Some(Duration::from_secs_f64(delay.max(0.0)))
    }
}

/// Transport layer that bounds every attempt with a deadline and retries
/// transient failures with exponential backoff.
///
/// Node-side errors (`TransportError::Rpc`) and a closed transport are
/// returned immediately.
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
    deadline: Duration,
}

impl<T: RpcTransport> Retrying<T> {
    pub fn new(inner: T, config: RetryConfig, deadline: Duration) -> Self {
        Self {
            inner,
            policy: RetryPolicy::new(config),
            deadline,
        }
    }

    async fn attempt(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        match tokio::time::timeout(self.deadline, self.inner.send(req)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                ms: self.deadline.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl<T: RpcTransport> RpcTransport for Retrying<T> {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt(req.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => match self.policy.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method = %req.method,
                            url = %self.inner.url(),
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempt,
                            error = %e,
                            method = %req.method,
                            url = %self.inner.url(),
                            "max retries exceeded"
                        );
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn health(&self) -> HealthStatus {
        self.inner.health()
    }

    fn url(&self) -> &str {
        self.inner.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcError, RpcId};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
            jitter_fraction: 0.0,
        }
    }

    #[test]
    fn exponential_delays() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_fraction: 0.0,
        });
        assert_eq!(policy.next_delay(1).unwrap().as_millis(), 100);
        assert_eq!(policy.next_delay(2).unwrap().as_millis(), 200);
        assert_eq!(policy.next_delay(3).unwrap().as_millis(), 400);
        assert!(policy.next_delay(4).is_none());
    }

    #[test]
    fn delay_capped_at_max() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            multiplier: 10.0,
            jitter_fraction: 0.0,
        });
        let d5 = policy.next_delay(5).unwrap();
        assert!(d5 <= Duration::from_millis(500), "d5={d5:?} exceeds max");
    }

    #[test]
    fn jitter_spreads_delays_around_the_backoff() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_fraction: 0.5,
        });
        let delays: Vec<Duration> = (0..32).map(|_| policy.next_delay(1).unwrap()).collect();
        for d in &delays {
            assert!(
                (Duration::from_millis(50)..=Duration::from_millis(150)).contains(d),
                "{d:?} outside 100ms ± 50%"
            );
        }
        assert!(delays.iter().any(|d| *d != delays[0]), "delays never varied");
        assert!(policy.next_delay(2).is_none());
    }

    /// Fails the first `failures` calls with `error`, then succeeds.
    struct Flaky {
        calls: Arc<AtomicU32>,
        failures: u32,
        error: fn() -> TransportError,
        stall: bool,
    }

    #[async_trait]
    impl RpcTransport for Flaky {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                if self.stall {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                return Err((self.error)());
            }
            Ok(JsonRpcResponse::success(req.id, serde_json::json!("0x1")))
        }

        fn url(&self) -> &str {
            "mock://flaky"
        }
    }

    fn flaky(failures: u32, error: fn() -> TransportError, stall: bool) -> (Flaky, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let t = Flaky { calls: Arc::clone(&calls), failures, error, stall };
        (t, calls)
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (t, calls) = flaky(2, || TransportError::Http("502".into()), false);
        let layer = Retrying::new(t, no_jitter(3), Duration::from_secs(1));
        let resp = layer.send(JsonRpcRequest::new(1, "eth_call", vec![])).await.unwrap();
        assert_eq!(resp.id, RpcId::Number(1));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (t, calls) = flaky(10, || TransportError::WebSocket("reset".into()), false);
        let layer = Retrying::new(t, no_jitter(2), Duration::from_secs(1));
        let err = layer.send(JsonRpcRequest::new(1, "eth_call", vec![])).await.unwrap_err();
        assert!(matches!(err, TransportError::WebSocket(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn node_errors_are_not_retried() {
        let (t, calls) = flaky(
            10,
            || {
                TransportError::Rpc(JsonRpcError {
                    code: 3,
                    message: "execution reverted".into(),
                    data: None,
                })
            },
            false,
        );
        let layer = Retrying::new(t, no_jitter(5), Duration::from_secs(1));
        assert!(layer.send(JsonRpcRequest::new(1, "eth_call", vec![])).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_retryable_timeout() {
        let (t, calls) = flaky(1, || TransportError::Other("unreachable".into()), true);
        let layer = Retrying::new(t, no_jitter(1), Duration::from_millis(20));
        let resp = layer.send(JsonRpcRequest::new(9, "eth_call", vec![])).await.unwrap();
        assert_eq!(resp.id, RpcId::Number(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

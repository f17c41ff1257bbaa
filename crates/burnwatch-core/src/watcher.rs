//! The single-consumer watch loop.

use futures::{Stream, StreamExt};

use crate::error::{SubscriptionError, WatchError};
use crate::handler::LogHandler;
use crate::types::TransferLog;

/// Feed every log from `logs` through `handler`, one at a time.
///
/// Handler errors are logged and skipped. The first subscription error ends
/// the loop; nothing after it is processed. Returns the number of logs handled
/// if the stream ends cleanly.
pub async fn watch<S, H>(mut logs: S, handler: &H) -> Result<u64, WatchError>
where
    S: Stream<Item = Result<TransferLog, SubscriptionError>> + Unpin,
    H: LogHandler + ?Sized,
{
    let mut handled = 0u64;
    while let Some(item) = logs.next().await {
        let log = match item {
            Ok(log) => log,
            Err(e) => {
                tracing::error!(error = %e, handled, "log subscription terminated");
                return Err(WatchError::Subscription(e));
            }
        };

        handled += 1;
        if let Err(e) = handler.handle(&log).await {
            tracing::error!(tx = %log.transaction_hash, error = %e, "failed to process log");
        }
    }
    tracing::info!(handled, "log stream ended");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256};
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("handler refused")]
    struct Refused;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<B256>>,
        fail: bool,
    }

    #[async_trait]
    impl LogHandler for Recording {
        type Error = Refused;

        async fn handle(&self, log: &TransferLog) -> Result<(), Refused> {
            self.seen.lock().unwrap().push(log.transaction_hash);
            if self.fail {
                Err(Refused)
            } else {
                Ok(())
            }
        }
    }

    fn log(n: u8) -> TransferLog {
        TransferLog {
            transaction_hash: B256::repeat_byte(n),
            block_number: 1,
            address: Address::ZERO,
            topics: vec![],
            data: Bytes::new(),
            removed: false,
        }
    }

    #[tokio::test]
    async fn stops_at_first_subscription_error() {
        let items = vec![
            Ok(log(1)),
            Err(SubscriptionError::Closed { id: "0x1".into() }),
            Ok(log(2)),
        ];
        let handler = Recording::default();
        let result = watch(stream::iter(items), &handler).await;

        assert!(matches!(result, Err(WatchError::Subscription(_))));
        assert_eq!(*handler.seen.lock().unwrap(), vec![B256::repeat_byte(1)]);
    }

    #[tokio::test]
    async fn handler_errors_do_not_stop_the_loop() {
        let handler = Recording {
            fail: true,
            ..Default::default()
        };
        let result = watch(stream::iter(vec![Ok(log(1)), Ok(log(2))]), &handler).await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(handler.seen.lock().unwrap().len(), 2);
    }
}

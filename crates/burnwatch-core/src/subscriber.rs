//! Subscription to `Transfer` logs whose recipient is the dead address.

use alloy_primitives::Address;
use burnwatch_rpc_core::{PubSubTransport, SubscriptionId};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::abi::transfer_topic;
use crate::error::SubscriptionError;
use crate::types::TransferLog;

/// Logs from one subscription. Ends with exactly one `Err` when the
/// subscription closes.
pub type TransferLogStream = BoxStream<'static, Result<TransferLog, SubscriptionError>>;

/// `logs` filter matching `Transfer(_, dead, _)` from any contract.
pub fn dead_transfer_filter(dead: Address) -> Value {
    json!({ "topics": [transfer_topic(), Value::Null, dead.into_word()] })
}

/// Open the dead-address `Transfer` subscription.
pub async fn subscribe_dead_transfers<P>(
    transport: &P,
    dead: Address,
) -> Result<TransferLogStream, SubscriptionError>
where
    P: PubSubTransport + ?Sized,
{
    let (id, rx) = transport
        .subscribe("logs", vec![dead_transfer_filter(dead)])
        .await
        .map_err(SubscriptionError::Subscribe)?;
    tracing::info!(subscription = %id, dead = %dead, "subscribed to dead-address transfers");
    Ok(log_stream(id, rx))
}

/// Turn raw notifications into parsed logs.
///
/// Unparseable notifications and reorged-out logs are skipped.
pub fn log_stream(id: SubscriptionId, rx: mpsc::UnboundedReceiver<Value>) -> TransferLogStream {
    stream::unfold(Some(rx), move |state| {
        let id = id.clone();
        async move {
            let mut rx = state?;
            loop {
                let Some(raw) = rx.recv().await else {
                    let err = SubscriptionError::Closed { id: id.to_string() };
                    return Some((Err(err), None));
                };
                match serde_json::from_value::<TransferLog>(raw) {
                    Ok(log) if log.removed => {
                        tracing::debug!(tx = %log.transaction_hash, "skipping removed log");
                    }
                    Ok(log) => return Some((Ok(log), Some(rx))),
                    Err(e) => {
                        tracing::debug!(subscription = %id, error = %e, "unparseable log notification");
                    }
                }
            }
        }
    })
    .boxed()
}

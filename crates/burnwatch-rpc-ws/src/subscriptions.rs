//! WebSocket subscription bookkeeping.
//!
//! Tracks active `eth_subscribe` subscriptions so they can be re-established
//! after a reconnect. Nodes assign a fresh ID on every `eth_subscribe`, so a
//! resubscribed entry is moved to its new ID while keeping the caller's channel.

use std::collections::HashMap;

use burnwatch_rpc_core::SubscriptionId;
use serde_json::Value;
use tokio::sync::mpsc;

struct SubscriptionEntry {
    /// Subscription type (e.g. `"logs"`).
    kind: String,
    /// Parameters needed to resubscribe (e.g. the log filter).
    params: Vec<Value>,
    sender: mpsc::UnboundedSender<Value>,
    last_block: Option<u64>,
}

/// Active subscriptions keyed by the node-assigned ID.
#[derive(Default)]
pub struct SubscriptionManager {
    entries: HashMap<SubscriptionId, SubscriptionEntry>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription and return the receiving end of its channel.
    pub fn register(
        &mut self,
        id: SubscriptionId,
        kind: String,
        params: Vec<Value>,
    ) -> mpsc::UnboundedReceiver<Value> {
        let (sender, rx) = mpsc::unbounded_channel();
        self.entries.insert(
            id,
            SubscriptionEntry {
                kind,
                params,
                sender,
                last_block: None,
            },
        );
        rx
    }

    /// Forward a notification to its subscriber.
    ///
    /// Returns `false` if the ID is unknown. A subscriber whose receiver has
    /// been dropped is forgotten.
    pub fn dispatch(&mut self, id: &SubscriptionId, message: Value) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if let Some(block) = block_number(&message) {
            entry.last_block = Some(entry.last_block.map_or(block, |seen| seen.max(block)));
        }
        if entry.sender.send(message).is_err() {
            self.entries.remove(id);
        }
        true
    }

    /// Move a subscription to the ID the node assigned on resubscribe.
    pub fn rekey(&mut self, old: &SubscriptionId, new: SubscriptionId) -> bool {
        match self.entries.remove(old) {
            Some(entry) => {
                self.entries.insert(new, entry);
                true
            }
            None => false,
        }
    }

    /// Forget a subscription, closing its channel.
    pub fn remove(&mut self, id: &SubscriptionId) {
        self.entries.remove(id);
    }

    /// Forget every subscription, closing all channels.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `(id, kind, params)` for every active subscription.
    pub fn active_subscriptions(&self) -> Vec<(SubscriptionId, String, Vec<Value>)> {
        self.entries
            .iter()
            .map(|(id, e)| (id.clone(), e.kind.clone(), e.params.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest `blockNumber` delivered on `id`, if any notification carried one.
    pub fn last_block(&self, id: &SubscriptionId) -> Option<u64> {
        self.entries.get(id).and_then(|e| e.last_block)
    }
}

/// `blockNumber` of a log or header notification (`"0x..."` quantity).
fn block_number(message: &Value) -> Option<u64> {
    let hex = message.get("blockNumber")?.as_str()?;
    u64::from_str_radix(hex.strip_prefix("0x")?, 16).ok()
}

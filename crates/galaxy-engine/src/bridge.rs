//! Remote execution bridge
//!
//! Remote definition dialects run their code outside the process. A call:
//! - allocates a fresh [`TaskId`] and parks a one-shot reply slot under it,
//! - hands a [`BridgeRequest`] to the [`BridgeTransport`] (fire-and-forget),
//! - suspends until the host calls [`RemoteBridge::resolve`] with that id.
//!
//! Each slot fires at most once. A reply for an unknown or already-fired id
//! is logged and dropped. Outstanding calls are independent, so replies may
//! arrive in any order.

use crate::error::BridgeError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use ulid::Ulid;

/// Correlation id of one remote call (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sandboxed runtime a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `code` is a parenthesised function expression applied to `input`
    Deno,
    /// `code` is a complete script printing its result
    Python,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deno => f.write_str("deno"),
            Self::Python => f.write_str("python"),
        }
    }
}

/// Request handed to the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub task_id: TaskId,
    pub dialect: Dialect,
    pub code: String,
    pub input: Value,
}

/// Tagged reply from the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeReply {
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Unwrap the tag; a failed reply is indistinguishable from a local error
    pub fn into_result(self) -> Result<Value, BridgeError> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Remote(
                self.error.unwrap_or_else(|| "remote execution failed".to_string()),
            ))
        }
    }
}

/// Delivers requests to whatever runs the code
pub trait BridgeTransport: Send + Sync {
    /// Hand over a request without waiting for its result
    fn dispatch(&self, request: BridgeRequest) -> Result<(), BridgeError>;
}

/// Transport feeding an in-process channel drained by a host runner
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<BridgeRequest>,
}

impl ChannelTransport {
    /// Transport plus the receiving end for the runner
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl BridgeTransport for ChannelTransport {
    fn dispatch(&self, request: BridgeRequest) -> Result<(), BridgeError> {
        self.sender
            .send(request)
            .map_err(|_| BridgeError::Transport("runner channel closed".to_string()))
    }
}

/// Client side of the bridge: the pending-request table
pub struct RemoteBridge {
    transport: Arc<dyn BridgeTransport>,
    pending: DashMap<TaskId, oneshot::Sender<BridgeReply>>,
    timeout: Option<Duration>,
}

impl RemoteBridge {
    #[must_use]
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            transport,
            pending: DashMap::new(),
            timeout: None,
        }
    }

    /// Fail calls that get no reply within `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `code` remotely and wait for its reply
    ///
    /// # Errors
    /// - `Transport` if the request could not be handed over
    /// - `Remote` if the runner reported failure
    /// - `TimedOut` if a timeout is set and elapses first
    pub async fn call(&self, dialect: Dialect, code: String, input: Value) -> Result<Value, BridgeError> {
        let task_id = TaskId::new();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(task_id, sender);
        // Removes the slot if this future is dropped or fails before a reply
        let _slot = PendingSlot {
            pending: &self.pending,
            task_id,
        };

        tracing::debug!(%task_id, %dialect, "dispatching remote call");
        self.transport.dispatch(BridgeRequest {
            task_id,
            dialect,
            code,
            input,
        })?;

        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, receiver).await.map_err(|_| {
                tracing::warn!(%task_id, "remote call timed out");
                BridgeError::TimedOut {
                    task_id: task_id.to_string(),
                    secs: limit.as_secs(),
                }
            })?,
            None => receiver.await,
        }
        .map_err(|_| BridgeError::Abandoned(task_id.to_string()))?;

        reply.into_result()
    }

    /// Deliver a reply; `false` when no call is waiting under `task_id`
    pub fn resolve(&self, task_id: TaskId, reply: BridgeReply) -> bool {
        match self.pending.remove(&task_id) {
            Some((_, sender)) => sender.send(reply).is_ok(),
            None => {
                tracing::warn!(%task_id, "reply for unknown task ignored");
                false
            }
        }
    }

    /// Calls still waiting for a reply
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for RemoteBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBridge")
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct PendingSlot<'b> {
    pending: &'b DashMap<TaskId, oneshot::Sender<BridgeReply>>,
    task_id: TaskId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Weak;

    /// Replies synchronously from inside `dispatch`
    struct EchoTransport {
        bridge: Mutex<Weak<RemoteBridge>>,
    }

    impl BridgeTransport for EchoTransport {
        fn dispatch(&self, request: BridgeRequest) -> Result<(), BridgeError> {
            if let Some(bridge) = self.bridge.lock().upgrade() {
                bridge.resolve(request.task_id, BridgeReply::ok(request.input));
            }
            Ok(())
        }
    }

    fn echo_bridge() -> Arc<RemoteBridge> {
        let transport = Arc::new(EchoTransport {
            bridge: Mutex::new(Weak::new()),
        });
        let bridge = Arc::new(RemoteBridge::new(transport.clone()));
        *transport.bridge.lock() = Arc::downgrade(&bridge);
        bridge
    }

    #[tokio::test]
    async fn reply_inside_dispatch_is_delivered() {
        let bridge = echo_bridge();
        let value = bridge
            .call(Dialect::Deno, "(x => x)".into(), json!({"text": "5"}))
            .await
            .unwrap();
        assert_eq!(value, json!({"text": "5"}));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_task_is_a_noop() {
        let (transport, _rx) = ChannelTransport::new();
        let bridge = RemoteBridge::new(Arc::new(transport));
        assert!(!bridge.resolve(TaskId::new(), BridgeReply::ok(json!(1))));
    }

    #[tokio::test]
    async fn failed_reply_becomes_error() {
        let (transport, mut rx) = ChannelTransport::new();
        let bridge = Arc::new(RemoteBridge::new(Arc::new(transport)));

        let runner = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                let request = rx.recv().await.unwrap();
                assert!(bridge.resolve(request.task_id, BridgeReply::err("NameError: x")));
                // second delivery for the same id is ignored
                assert!(!bridge.resolve(request.task_id, BridgeReply::ok(json!(0))));
            })
        };

        let err = bridge
            .call(Dialect::Python, "print(x)".into(), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::Remote("NameError: x".into()));
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn closed_transport_leaves_no_pending_entry() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        let bridge = RemoteBridge::new(Arc::new(transport));
        let err = bridge.call(Dialect::Deno, "()".into(), Value::Null).await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_pending_entry() {
        let (transport, _rx) = ChannelTransport::new();
        let bridge = RemoteBridge::new(Arc::new(transport)).with_timeout(Some(Duration::from_secs(5)));
        let err = bridge.call(Dialect::Deno, "()".into(), Value::Null).await.unwrap_err();
        assert!(matches!(err, BridgeError::TimedOut { secs: 5, .. }));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[test]
    fn reply_wire_format() {
        let reply: BridgeReply = serde_json::from_str(r#"{"success":true,"data":[1,2]}"#).unwrap();
        assert_eq!(reply.into_result().unwrap(), json!([1, 2]));
        let reply: BridgeReply = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(reply.into_result().is_err());
    }
}

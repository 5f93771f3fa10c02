//! Per-call serving environment.
//!
//! A method that declares a [`CallContext`] parameter receives it from the
//! router; it is never decoded from caller input and does not count towards
//! the caller-visible arity.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{ChannelClosed, PushError};
use crate::types::{JsonRpcRequest, JSONRPC_VERSION};

/// Which path a call arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// `GET|POST /<method>` with form/query values.
    Http,
    /// `POST /` with a JSON-RPC body.
    JsonRpc,
    /// The persistent duplex channel.
    Duplex,
}

/// Handle for pushing frames onto a duplex session.
///
/// All frames pass through the session's single writer task, so clones can be
/// used from any number of concurrent calls without interleaving.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: mpsc::Sender<String>,
}

impl ChannelSender {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Queue an already-encoded frame.
    pub async fn send_raw(&self, frame: String) -> Result<(), ChannelClosed> {
        self.tx.send(frame).await.map_err(|_| ChannelClosed)
    }

    /// Serialize and queue a value as one text frame.
    pub async fn send_json<T: Serialize>(&self, value: &T) -> Result<(), PushError> {
        let frame = serde_json::to_string(value).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode duplex frame");
            PushError::Encode(e)
        })?;
        Ok(self.send_raw(frame).await?)
    }

    /// Push a server-initiated JSON-RPC notification (no id) to the peer.
    pub async fn notify(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<(), PushError> {
        let msg = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params: Some(params),
        };
        self.send_json(&msg).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Request-scoped data injected into methods that ask for it.
#[derive(Debug, Clone)]
pub struct CallContext {
    transport: Transport,
    request_id: Option<serde_json::Value>,
    channel: Option<ChannelSender>,
}

impl CallContext {
    pub fn http() -> Self {
        Self {
            transport: Transport::Http,
            request_id: None,
            channel: None,
        }
    }

    pub fn json_rpc() -> Self {
        Self {
            transport: Transport::JsonRpc,
            request_id: None,
            channel: None,
        }
    }

    pub fn duplex(channel: ChannelSender) -> Self {
        Self {
            transport: Transport::Duplex,
            request_id: None,
            channel: Some(channel),
        }
    }

    /// Same environment, scoped to one JSON-RPC request.
    pub fn with_request_id(&self, id: Option<serde_json::Value>) -> Self {
        Self {
            request_id: id,
            ..self.clone()
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn request_id(&self) -> Option<&serde_json::Value> {
        self.request_id.as_ref()
    }

    /// The duplex session this call arrived on, if any.
    pub fn channel(&self) -> Option<&ChannelSender> {
        self.channel.as_ref()
    }
}

//! Transport-agnostic JSON-RPC 2.0 dispatcher.
//!
//! `RpcRouter` owns a shared, read-only [`MethodRegistry`] and drives each
//! call from parsing to an encoded response. It is intentionally free of any
//! HTTP or framework dependency so it can be used from:
//!
//! - the per-method HTTP handlers (`call`)
//! - the shared JSON-RPC endpoint (`handle_request` / `handle_value`)
//! - the duplex channel, one frame at a time

use std::sync::Arc;

use serde::Serialize;

use crate::binder::RawArgs;
use crate::codec::TypeTags;
use crate::context::{CallContext, Transport};
use crate::error::CallError;
use crate::registry::{DuplexPolicy, MethodRegistry, RegisteredMethod};
use crate::signature::{ParamDescriptor, ReturnDescriptor};
use crate::types::*;

/// One entry of the method listing.
#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    pub returns: ReturnDescriptor,
    pub duplex: bool,
    pub cacheable: bool,
}

/// Transport-agnostic JSON-RPC router.
///
/// # Usage
///
/// ```ignore
/// let router = RpcRouter::new(registry);
///
/// // From raw JSON string:
/// let response_json = router.handle_request(raw_json_str, CallContext::json_rpc()).await;
///
/// // From a parsed request:
/// let response = router.dispatch(request, &CallContext::json_rpc()).await;
/// ```
#[derive(Clone)]
pub struct RpcRouter {
    registry: Arc<MethodRegistry>,
    tags: Arc<TypeTags>,
    policy: DuplexPolicy,
}

impl RpcRouter {
    /// Freeze `registry` and build a router over it.
    pub fn new(registry: MethodRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<MethodRegistry>) -> Self {
        Self {
            registry,
            tags: Arc::new(TypeTags::new()),
            policy: DuplexPolicy::default(),
        }
    }

    pub fn with_tags(mut self, tags: TypeTags) -> Self {
        self.tags = Arc::new(tags);
        self
    }

    pub fn with_policy(mut self, policy: DuplexPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn policy(&self) -> DuplexPolicy {
        self.policy
    }

    /// Resolve, bind, invoke and encode one call.
    pub async fn call(
        &self,
        method: &str,
        raw: RawArgs,
        ctx: &CallContext,
    ) -> Result<serde_json::Value, CallError> {
        let entry = self.resolve(method, ctx.transport())?;
        tracing::debug!(method, transport = ?ctx.transport(), "dispatching call");

        let tagged = entry.invoke(raw, ctx).await?.into_result()?;
        Ok(self.tags.render(tagged))
    }

    fn resolve(&self, method: &str, transport: Transport) -> Result<&RegisteredMethod, CallError> {
        self.registry
            .lookup(method)
            .filter(|m| m.is_reachable(transport, self.policy))
            .map(Arc::as_ref)
            .ok_or_else(|| CallError::MethodNotFound(method.to_string()))
    }

    /// Handle a raw JSON string. Returns `None` when there is nothing to send
    /// back (notifications only).
    pub async fn handle_request(&self, raw: &str, ctx: CallContext) -> Option<String> {
        self.handle_bytes(raw.as_bytes(), ctx).await
    }

    /// Handle a raw body. Bytes that are not UTF-8 JSON are a parse error.
    pub async fn handle_bytes(&self, raw: &[u8], ctx: CallContext) -> Option<String> {
        let value: serde_json::Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(e) => {
                let resp = CallError::Parse(e.to_string()).to_response(None);
                return Some(encode(&resp).to_string());
            }
        };
        self.handle_value(value, ctx).await.map(|v| v.to_string())
    }

    /// Handle a parsed body: one request object or a batch array.
    pub async fn handle_value(
        &self,
        value: serde_json::Value,
        ctx: CallContext,
    ) -> Option<serde_json::Value> {
        match value {
            serde_json::Value::Array(items) if items.is_empty() => Some(encode(
                &CallError::InvalidRequest("empty batch".into()).to_response(None),
            )),
            serde_json::Value::Array(items) => {
                let pending = items.into_iter().map(|item| self.dispatch_value(item, &ctx));
                let responses: Vec<serde_json::Value> = futures::future::join_all(pending)
                    .await
                    .into_iter()
                    .flatten()
                    .map(|resp| encode(&resp))
                    .collect();
                (!responses.is_empty()).then_some(serde_json::Value::Array(responses))
            }
            single => self
                .dispatch_value(single, &ctx)
                .await
                .map(|resp| encode(&resp)),
        }
    }

    async fn dispatch_value(
        &self,
        value: serde_json::Value,
        ctx: &CallContext,
    ) -> Option<JsonRpcResponse> {
        let id = value.get("id").filter(|id| !id.is_null()).cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) => self.dispatch(req, ctx).await,
            Err(e) => Some(CallError::InvalidRequest(e.to_string()).to_response(id)),
        }
    }

    /// Dispatch a parsed JSON-RPC request. Notifications run but yield `None`.
    pub async fn dispatch(
        &self,
        req: JsonRpcRequest,
        ctx: &CallContext,
    ) -> Option<JsonRpcResponse> {
        let notification = req.is_notification();
        let JsonRpcRequest {
            jsonrpc,
            id,
            method,
            params,
        } = req;
        let ctx = ctx.with_request_id(id.clone());

        let result = if jsonrpc != JSONRPC_VERSION {
            Err(CallError::InvalidRequest(
                "Invalid JSON-RPC version, expected \"2.0\"".into(),
            ))
        } else {
            match RawArgs::from_params(params) {
                Ok(raw) => self.call(&method, raw, &ctx).await,
                Err(e) => Err(e),
            }
        };

        match &result {
            Err(err) if err.is_application() => {
                tracing::debug!(method = %method, error = %err, "method returned an error")
            }
            Err(err) => tracing::debug!(method = %method, error = %err, "call rejected"),
            Ok(_) => {}
        }

        if notification {
            return None;
        }
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => err.to_response(id),
        })
    }

    /// Describe every registered method, sorted by name.
    pub fn method_list(&self) -> Vec<MethodInfo> {
        self.registry
            .iter()
            .map(|m| MethodInfo {
                name: m.name().to_string(),
                params: m.signature().visible_params().cloned().collect(),
                returns: m.signature().returns,
                duplex: m.options().duplex,
                cacheable: m.options().cacheable,
            })
            .collect()
    }
}

fn encode(resp: &JsonRpcResponse) -> serde_json::Value {
    serde_json::to_value(resp).unwrap_or_else(|_| {
        serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": null,
            "error": {"code": INTERNAL_ERROR, "message": "Failed to serialize response"}
        })
    })
}

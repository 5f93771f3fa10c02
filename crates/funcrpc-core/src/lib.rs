//! funcrpc Core: transport-agnostic remote procedure dispatch.
//!
//! Plain async functions are registered under a name together with their
//! argument names. Their parameter and return types are captured once, at
//! registration, and every call is then bound, invoked and encoded through
//! the same path regardless of how it arrived:
//!
//! - per-method HTTP endpoints (form/query values)
//! - a shared JSON-RPC 2.0 endpoint (single or batch)
//! - a persistent duplex channel
//!
//! This crate has **no HTTP framework dependency** by default; see
//! `funcrpc-server` for the axum adapter.
//!
//! # Feature Flags
//!
//! - `axum`: Enables `IntoResponse` impl on `CallError` for use in axum handlers.

pub mod binder;
pub mod codec;
pub mod context;
pub mod encoder;
pub mod error;
pub mod handler;
pub mod registry;
pub mod router;
pub mod signature;
pub mod types;

// Convenience re-exports
pub use binder::RawArgs;
pub use codec::TypeTags;
pub use context::{CallContext, ChannelSender, Transport};
pub use encoder::{Outcome, TaggedValue};
pub use error::{CallError, ChannelClosed, PushError, RegistrationError};
pub use registry::{DuplexPolicy, MethodOption, MethodRegistry, RegisteredMethod};
pub use router::{MethodInfo, RpcRouter};
pub use signature::{Bytes, FromArg, Structured};
pub use types::{JsonRpcRequest, JsonRpcResponse};

//! funcrpc CLI library: the demo method set served by `funcrpc serve`.
//!
//! Kept separate from the binary so integration tests can drive the same
//! registry through [`RpcRouter`](funcrpc_core::RpcRouter).

pub mod demo;

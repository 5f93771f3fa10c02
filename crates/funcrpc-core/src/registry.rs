//! Method registry.
//!
//! Populated once at startup, then shared read-only (behind an `Arc`) with
//! every request worker. There is no way to add or remove methods after the
//! registry has been handed to a router.
//!
//! # Example
//!
//! ```ignore
//! use funcrpc_core::{MethodOption, MethodRegistry};
//!
//! async fn block(height: i64) -> Result<Block, StoreError> { /* ... */ }
//!
//! let mut registry = MethodRegistry::new();
//! registry.register("block", block, "height", &[MethodOption::Cacheable])?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::binder::{ArgumentBinder, RawArgs};
use crate::context::{CallContext, Transport};
use crate::encoder::Outcome;
use crate::error::{CallError, RegistrationError};
use crate::handler::{ErasedHandler, FnHandler, RpcHandler};
use crate::signature::Signature;

/// Path segment reserved for the duplex channel.
pub const RESERVED_WEBSOCKET: &str = "websocket";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOption {
    /// Reachable over the persistent duplex channel.
    Duplex,
    /// Advisory: results may be cached by an external proxy.
    Cacheable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodOptions {
    pub duplex: bool,
    pub cacheable: bool,
}

impl MethodOptions {
    fn from_list(options: &[MethodOption]) -> Self {
        let mut opts = Self::default();
        for opt in options {
            match opt {
                MethodOption::Duplex => opts.duplex = true,
                MethodOption::Cacheable => opts.cacheable = true,
            }
        }
        opts
    }
}

/// Which HTTP paths a duplex-enabled method stays reachable on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplexPolicy {
    /// Duplex-enabled methods are also callable over both HTTP paths.
    #[default]
    Shared,
    /// Duplex-enabled methods are only callable over the duplex channel.
    ChannelOnly,
}

pub struct RegisteredMethod {
    name: String,
    signature: Signature,
    options: MethodOptions,
    handler: Box<dyn ErasedHandler>,
}

impl RegisteredMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn options(&self) -> MethodOptions {
        self.options
    }

    /// The duplex channel only carries duplex-enabled methods; HTTP paths
    /// carry everything except what the policy reserves for the channel.
    pub fn is_reachable(&self, transport: Transport, policy: DuplexPolicy) -> bool {
        match transport {
            Transport::Duplex => self.options.duplex,
            Transport::Http | Transport::JsonRpc => {
                !(self.options.duplex && policy == DuplexPolicy::ChannelOnly)
            }
        }
    }

    /// Bind `raw` against the signature, run the callable and encode its outcome.
    pub async fn invoke(&self, raw: RawArgs, ctx: &CallContext) -> Result<Outcome, CallError> {
        let fut = {
            let mut binder = ArgumentBinder::new(&self.name, &self.signature, raw, ctx)?;
            self.handler.invoke(&mut binder)?
        };
        fut.await
    }
}

impl fmt::Debug for RegisteredMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredMethod")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<RegisteredMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `f`'s signature and store it under `name`.
    ///
    /// `arg_names` is a comma-separated list naming the caller-visible
    /// parameters in order. Registering an existing name replaces the earlier
    /// entry.
    pub fn register<F, Args>(
        &mut self,
        name: &str,
        f: F,
        arg_names: &str,
        options: &[MethodOption],
    ) -> Result<&RegisteredMethod, RegistrationError>
    where
        F: RpcHandler<Args>,
        Args: 'static,
    {
        validate_name(name)?;
        let signature = Signature::capture(name, F::param_types(), F::return_types(), arg_names)?;

        let method = RegisteredMethod {
            name: name.to_string(),
            signature,
            options: MethodOptions::from_list(options),
            handler: Box::new(FnHandler::new(f)),
        };

        if self.methods.insert(name.to_string(), Arc::new(method)).is_some() {
            tracing::debug!(method = name, "replaced registered method");
        }
        Ok(self.methods[name].as_ref())
    }

    /// `register` with [`MethodOption::Duplex`] appended.
    pub fn register_duplex<F, Args>(
        &mut self,
        name: &str,
        f: F,
        arg_names: &str,
        options: &[MethodOption],
    ) -> Result<&RegisteredMethod, RegistrationError>
    where
        F: RpcHandler<Args>,
        Args: 'static,
    {
        let mut options = options.to_vec();
        options.push(MethodOption::Duplex);
        self.register(name, f, arg_names, &options)
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<RegisteredMethod>> {
        self.methods.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredMethod>> {
        let mut entries: Vec<_> = self.methods.values().collect();
        entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), RegistrationError> {
    let valid = !name.is_empty()
        && name != RESERVED_WEBSOCKET
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(RegistrationError::InvalidName(name.to_string()))
    }
}

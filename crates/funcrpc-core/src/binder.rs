//! Decoding caller input into a method's declared parameter types.

use std::collections::HashMap;

use crate::context::CallContext;
use crate::error::CallError;
use crate::signature::{FromArg, Signature};

/// Raw call arguments as they arrived on the wire.
#[derive(Debug, Clone)]
pub enum RawArgs {
    /// Form/query values from the per-method HTTP path, keyed by parameter name.
    Text(HashMap<String, String>),
    /// JSON-RPC `params` array.
    Positional(Vec<serde_json::Value>),
    /// JSON-RPC `params` object.
    Named(serde_json::Map<String, serde_json::Value>),
}

impl RawArgs {
    /// Interpret a JSON-RPC `params` member. Absent or `null` means no arguments.
    pub fn from_params(params: Option<serde_json::Value>) -> Result<Self, CallError> {
        match params {
            None | Some(serde_json::Value::Null) => Ok(RawArgs::Positional(Vec::new())),
            Some(serde_json::Value::Array(items)) => Ok(RawArgs::Positional(items)),
            Some(serde_json::Value::Object(map)) => Ok(RawArgs::Named(map)),
            Some(other) => Err(CallError::InvalidParams(format!(
                "params must be an array or an object, got {}",
                other
            ))),
        }
    }
}

enum Source {
    Text(HashMap<String, String>),
    /// JSON values aligned with `Signature::params`; `None` where not supplied.
    Json(Vec<Option<serde_json::Value>>),
}

/// Binds raw arguments to one method's parameters, one slot at a time.
///
/// Construction enforces arity; [`ArgumentBinder::bind`] decodes a single slot
/// into its declared type.
pub struct ArgumentBinder<'a> {
    method: &'a str,
    signature: &'a Signature,
    ctx: &'a CallContext,
    source: Source,
}

impl<'a> ArgumentBinder<'a> {
    pub fn new(
        method: &'a str,
        signature: &'a Signature,
        raw: RawArgs,
        ctx: &'a CallContext,
    ) -> Result<Self, CallError> {
        let source = match raw {
            RawArgs::Text(values) => Source::Text(values),
            RawArgs::Positional(items) => Source::Json(align_positional(method, signature, items)?),
            RawArgs::Named(map) => Source::Json(align_named(method, signature, map)?),
        };
        Ok(Self {
            method,
            signature,
            ctx,
            source,
        })
    }

    /// Decode the parameter at `index` (declaration order, context included).
    pub fn bind<T: FromArg>(&mut self, index: usize) -> Result<T, CallError> {
        let param = self.signature.params.get(index).ok_or_else(|| {
            CallError::Internal(format!(
                "{}: no parameter at position {}",
                self.method, index
            ))
        })?;

        if param.is_injected() {
            return T::from_context(self.ctx).ok_or_else(|| {
                CallError::Internal(format!("{}: cannot inject {}", self.method, param.name))
            });
        }

        match &mut self.source {
            Source::Text(values) => match values.get(&param.name) {
                Some(raw) => T::from_text(raw).map_err(|e| CallError::ArgumentType {
                    name: param.name.clone(),
                    reason: e.to_string(),
                }),
                None => {
                    T::from_absent().ok_or_else(|| CallError::MissingArgument(param.name.clone()))
                }
            },
            Source::Json(slots) => match slots.get_mut(index).and_then(Option::take) {
                Some(value) => T::from_json(value).map_err(|e| {
                    CallError::InvalidParams(format!("{}: {}", param.name, e))
                }),
                None => T::from_absent().ok_or_else(|| {
                    CallError::InvalidParams(format!("missing param {}", param.name))
                }),
            },
        }
    }
}

fn align_positional(
    method: &str,
    signature: &Signature,
    items: Vec<serde_json::Value>,
) -> Result<Vec<Option<serde_json::Value>>, CallError> {
    let visible = signature.arity();
    let required = signature.required_arity();
    if items.len() < required || items.len() > visible {
        let expected = if required == visible {
            visible.to_string()
        } else {
            format!("{} to {}", required, visible)
        };
        return Err(CallError::InvalidParams(format!(
            "{} expects {} params, got {}",
            method,
            expected,
            items.len()
        )));
    }

    let mut items = items.into_iter();
    Ok(signature
        .params
        .iter()
        .map(|p| if p.is_injected() { None } else { items.next() })
        .collect())
}

fn align_named(
    method: &str,
    signature: &Signature,
    mut map: serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<Option<serde_json::Value>>, CallError> {
    let slots: Vec<_> = signature
        .params
        .iter()
        .map(|p| {
            if p.is_injected() {
                None
            } else {
                map.remove(&p.name)
            }
        })
        .collect();

    if let Some(unknown) = map.keys().next() {
        return Err(CallError::InvalidParams(format!(
            "{} has no param named {}",
            method, unknown
        )));
    }

    let missing = signature
        .params
        .iter()
        .zip(&slots)
        .find(|(p, slot)| !p.is_injected() && !p.ty.is_optional() && slot.is_none());
    if let Some((p, _)) = missing {
        return Err(CallError::InvalidParams(format!("missing param {}", p.name)));
    }

    Ok(slots)
}

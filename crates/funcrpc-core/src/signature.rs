//! Registration-time signature capture.
//!
//! Every parameter type a method may declare implements [`FromArg`], which
//! describes the type and knows how to decode it from either wire form. The
//! handler glue in [`crate::handler`] collects these descriptors once, when the
//! method is registered; nothing is inspected at call time.

use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::context::CallContext;
use crate::error::{DecodeError, RegistrationError};

/// Declared type of a parameter, as seen by the binder and the method listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Bool,
    Int { signed: bool, bits: u8 },
    Float { bits: u8 },
    Text,
    Bytes,
    Structured { type_name: &'static str },
    Optional(Box<TypeDescriptor>),
    /// Serving-environment handle filled in by the router.
    Context,
}

impl TypeDescriptor {
    pub fn is_injected(&self) -> bool {
        matches!(self, TypeDescriptor::Context)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::Int { signed: true, bits } => write!(f, "i{}", bits),
            TypeDescriptor::Int { signed: false, bits } => write!(f, "u{}", bits),
            TypeDescriptor::Float { bits } => write!(f, "f{}", bits),
            TypeDescriptor::Text => f.write_str("string"),
            TypeDescriptor::Bytes => f.write_str("bytes"),
            TypeDescriptor::Structured { type_name } => f.write_str(type_name),
            TypeDescriptor::Optional(inner) => write!(f, "optional<{}>", inner),
            TypeDescriptor::Context => f.write_str("context"),
        }
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A parameter type a registered method may declare.
pub trait FromArg: Sized + Send + 'static {
    fn descriptor() -> TypeDescriptor;

    /// Decode a form/query value from the per-method HTTP path.
    fn from_text(raw: &str) -> Result<Self, DecodeError>;

    /// Decode a JSON-RPC parameter.
    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError>;

    /// Value used when the caller omitted the argument. `None` means required.
    fn from_absent() -> Option<Self> {
        None
    }

    /// Value injected by the router instead of being decoded from input.
    fn from_context(_ctx: &CallContext) -> Option<Self> {
        None
    }
}

macro_rules! impl_from_arg_int {
    ($($ty:ty => $signed:expr, $as:ident;)*) => {
        $(
            impl FromArg for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::Int { signed: $signed, bits: <$ty>::BITS as u8 }
                }

                fn from_text(raw: &str) -> Result<Self, DecodeError> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|e| DecodeError::new(format!("expected {}: {}", stringify!($ty), e)))
                }

                fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
                    value
                        .$as()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| DecodeError::new(format!("expected {}, got {}", stringify!($ty), value)))
                }
            }
        )*
    };
}

impl_from_arg_int! {
    i8 => true, as_i64;
    i16 => true, as_i64;
    i32 => true, as_i64;
    i64 => true, as_i64;
    isize => true, as_i64;
    u8 => false, as_u64;
    u16 => false, as_u64;
    u32 => false, as_u64;
    u64 => false, as_u64;
    usize => false, as_u64;
}

impl FromArg for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float { bits: 64 }
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| DecodeError::new(format!("expected f64: {}", e)))
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        value
            .as_f64()
            .ok_or_else(|| DecodeError::new(format!("expected f64, got {}", value)))
    }
}

impl FromArg for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Float { bits: 32 }
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        raw.trim()
            .parse::<f32>()
            .map_err(|e| DecodeError::new(format!("expected f32: {}", e)))
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| DecodeError::new(format!("expected f32, got {}", value)))
    }
}

impl FromArg for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Bool
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(DecodeError::new(format!(
                "expected true or false, got {:?}",
                other
            ))),
        }
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        value
            .as_bool()
            .ok_or_else(|| DecodeError::new(format!("expected bool, got {}", value)))
    }
}

fn unquote(raw: &str) -> Option<Result<String, DecodeError>> {
    let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
    quoted.then(|| {
        serde_json::from_str::<String>(raw)
            .map_err(|e| DecodeError::new(format!("bad quoted string: {}", e)))
    })
}

impl FromArg for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Text
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        unquote(raw).unwrap_or_else(|| Ok(raw.to_string()))
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        match value {
            serde_json::Value::String(s) => Ok(s),
            other => Err(DecodeError::new(format!("expected string, got {}", other))),
        }
    }
}

/// A byte-sequence parameter.
///
/// Accepted as `0x`-prefixed hex or as a quoted string on the form path; as a
/// hex string, plain string or array of octets in JSON. Serialized as
/// upper-case hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    fn from_hex(digits: &str) -> Result<Self, DecodeError> {
        hex::decode(digits)
            .map(Bytes)
            .map_err(|e| DecodeError::new(format!("bad hex: {}", e)))
    }

    fn hex_digits(s: &str) -> Option<&str> {
        s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(&self.0))
    }
}

impl FromArg for Bytes {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Bytes
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        if let Some(digits) = Bytes::hex_digits(raw) {
            return Bytes::from_hex(digits);
        }
        match unquote(raw) {
            Some(s) => s.map(|s| Bytes(s.into_bytes())),
            None => Err(DecodeError::new(
                "expected 0x-prefixed hex or a quoted string",
            )),
        }
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        match value {
            serde_json::Value::String(s) => match Bytes::hex_digits(&s) {
                Some(digits) => Bytes::from_hex(digits),
                None => Ok(Bytes(s.into_bytes())),
            },
            value @ serde_json::Value::Array(_) => serde_json::from_value::<Vec<u8>>(value)
                .map(Bytes)
                .map_err(|e| DecodeError::new(format!("expected octets: {}", e))),
            other => Err(DecodeError::new(format!("expected bytes, got {}", other))),
        }
    }
}

/// A parameter decoded from an arbitrary JSON structure through serde.
///
/// Only reachable over JSON-RPC; form encoding cannot express it.
#[derive(Debug, Clone, PartialEq)]
pub struct Structured<T>(pub T);

impl<T> Structured<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Structured<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

const FORM_CANNOT_EXPRESS: &str = "structured arguments cannot be form-encoded";

impl<T: DeserializeOwned + Send + 'static> FromArg for Structured<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Structured {
            type_name: type_name::<T>(),
        }
    }

    fn from_text(_raw: &str) -> Result<Self, DecodeError> {
        Err(DecodeError::new(FORM_CANNOT_EXPRESS))
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        serde_json::from_value(value)
            .map(Structured)
            .map_err(|e| DecodeError::new(e.to_string()))
    }
}

impl FromArg for serde_json::Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Structured { type_name: "json" }
    }

    fn from_text(_raw: &str) -> Result<Self, DecodeError> {
        Err(DecodeError::new(FORM_CANNOT_EXPRESS))
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: FromArg> FromArg for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Optional(Box::new(T::descriptor()))
    }

    fn from_text(raw: &str) -> Result<Self, DecodeError> {
        T::from_text(raw).map(Some)
    }

    fn from_json(value: serde_json::Value) -> Result<Self, DecodeError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_json(value).map(Some)
    }

    fn from_absent() -> Option<Self> {
        Some(None)
    }
}

impl FromArg for CallContext {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Context
    }

    fn from_text(_raw: &str) -> Result<Self, DecodeError> {
        Err(DecodeError::new("context is supplied by the server"))
    }

    fn from_json(_value: serde_json::Value) -> Result<Self, DecodeError> {
        Err(DecodeError::new("context is supplied by the server"))
    }

    fn from_context(ctx: &CallContext) -> Option<Self> {
        Some(ctx.clone())
    }
}

// ---------------------------------------------------------------------------
// Captured signature
// ---------------------------------------------------------------------------

/// Name given to injected context parameters; callers never see it.
pub const CONTEXT_PARAM: &str = "ctx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl ParamDescriptor {
    pub fn is_injected(&self) -> bool {
        self.ty.is_injected()
    }
}

/// The two declared outputs of a method: domain result and error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReturnDescriptor {
    pub result: &'static str,
    pub error: &'static str,
}

impl ReturnDescriptor {
    pub fn of<R, E>() -> Self {
        Self {
            result: type_name::<R>(),
            error: type_name::<E>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub params: Vec<ParamDescriptor>,
    pub returns: ReturnDescriptor,
}

impl Signature {
    /// Pair the captured parameter types with the comma-separated names.
    ///
    /// Names cover caller-visible parameters only, in declaration order.
    pub fn capture(
        method: &str,
        types: Vec<TypeDescriptor>,
        returns: ReturnDescriptor,
        arg_names: &str,
    ) -> Result<Self, RegistrationError> {
        let names: Vec<&str> = if arg_names.trim().is_empty() {
            Vec::new()
        } else {
            arg_names.split(',').map(str::trim).collect()
        };

        let visible = types.iter().filter(|t| !t.is_injected()).count();
        if names.len() != visible {
            return Err(RegistrationError::ArgCountMismatch {
                method: method.to_string(),
                names: names.len(),
                params: visible,
            });
        }

        let mut seen = HashSet::new();
        for name in &names {
            if name.is_empty() || !seen.insert(*name) {
                return Err(RegistrationError::DuplicateArgument {
                    method: method.to_string(),
                    name: name.to_string(),
                });
            }
        }

        let mut names = names.into_iter();
        let params = types
            .into_iter()
            .map(|ty| {
                let name = if ty.is_injected() {
                    CONTEXT_PARAM
                } else {
                    names.next().unwrap_or_default()
                };
                ParamDescriptor {
                    name: name.to_string(),
                    ty,
                }
            })
            .collect();

        Ok(Self { params, returns })
    }

    /// Parameters the caller has to (or may) supply.
    pub fn visible_params(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().filter(|p| !p.is_injected())
    }

    pub fn arity(&self) -> usize {
        self.visible_params().count()
    }

    pub fn required_arity(&self) -> usize {
        self.visible_params().filter(|p| !p.ty.is_optional()).count()
    }
}

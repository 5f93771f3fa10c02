//! Turning a callable's `Result<R, E>` into a uniform [`Outcome`].

use std::any::{type_name, TypeId};
use std::fmt;

use serde::Serialize;

use crate::error::CallError;

/// A serialized result that still knows which Rust type produced it.
///
/// The holder is owned and mutable, so the tagging stage in [`crate::codec`]
/// can rewrite it in place regardless of where the original value lived.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    type_id: TypeId,
    type_name: &'static str,
    value: serde_json::Value,
}

impl TaggedValue {
    pub fn encode<R: Serialize + 'static>(result: &R) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            value: serde_json::to_value(result)?,
        })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut serde_json::Value {
        &mut self.value
    }

    pub fn into_value(self) -> serde_json::Value {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(TaggedValue),
    /// Rendered text of the callable's error value.
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Split into the wire-level result, mapping failures to `CallError::Application`.
    pub fn into_result(self) -> Result<TaggedValue, CallError> {
        match self {
            Outcome::Success(tagged) => Ok(tagged),
            Outcome::Failure(msg) => Err(CallError::Application(msg)),
        }
    }
}

pub struct ResultEncoder;

impl ResultEncoder {
    /// An error value wins; otherwise the result is serialized and tagged.
    ///
    /// Failing to serialize a result is a framework fault, never an
    /// application error.
    pub fn encode<R, E>(returned: Result<R, E>) -> Result<Outcome, CallError>
    where
        R: Serialize + 'static,
        E: fmt::Display,
    {
        match returned {
            Err(e) => Ok(Outcome::Failure(e.to_string())),
            Ok(result) => TaggedValue::encode(&result)
                .map(Outcome::Success)
                .map_err(|e| CallError::Internal(format!("failed to encode result: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Status {
        height: u64,
    }

    #[test]
    fn error_value_becomes_failure_without_result() {
        let outcome = ResultEncoder::encode::<Status, _>(Err("mempool is full")).unwrap();
        assert_eq!(outcome, Outcome::Failure("mempool is full".into()));
        assert_eq!(
            outcome.into_result(),
            Err(CallError::Application("mempool is full".into()))
        );
    }

    #[test]
    fn success_keeps_concrete_type() {
        let outcome = ResultEncoder::encode::<_, String>(Ok(Status { height: 10 })).unwrap();
        let Outcome::Success(mut tagged) = outcome else {
            panic!("expected success");
        };
        assert_eq!(tagged.type_id(), TypeId::of::<Status>());
        assert!(tagged.type_name().ends_with("Status"));
        assert_eq!(tagged.value(), &json!({"height": 10}));

        *tagged.value_mut() = json!({"height": 11});
        assert_eq!(tagged.into_value(), json!({"height": 11}));
    }

    #[test]
    fn unserializable_result_is_internal() {
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        let err = ResultEncoder::encode::<_, String>(Ok(bad)).unwrap_err();
        assert!(matches!(err, CallError::Internal(_)));
    }
}

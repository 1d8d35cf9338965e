//! Typed marshalling gateway: body bytes to and from type-erased Rust values.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A decoded body, downcast with `Arc::downcast::<T>()`.
pub type TypedValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("adapter '{name}' failed: {reason}")]
    Adapter { name: String, reason: String },
    #[error("cannot decode into {target}: {reason}")]
    Decode { target: &'static str, reason: String },
    #[error("cannot encode {target}: {reason}")]
    Encode { target: &'static str, reason: String },
    #[error("value is not a {expected}")]
    TypeMismatch { expected: &'static str },
}

/// Type-erased description of a decode target.
#[derive(Clone)]
pub struct TargetType {
    type_id: TypeId,
    name: &'static str,
    from_json: fn(JsonValue) -> Result<TypedValue, serde_json::Error>,
    to_json: fn(&TypedValue) -> Result<JsonValue, MarshalError>,
}

impl TargetType {
    /// Works for structs, collections and `#[serde(tag = "...")]` enums alike.
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            from_json: |json| serde_json::from_value::<T>(json).map(|v| Arc::new(v) as TypedValue),
            to_json: |value| {
                let typed = value
                    .downcast_ref::<T>()
                    .ok_or(MarshalError::TypeMismatch { expected: type_name::<T>() })?;
                serde_json::to_value(typed).map_err(|e| MarshalError::Encode {
                    target: type_name::<T>(),
                    reason: e.to_string(),
                })
            },
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn from_json(&self, json: JsonValue) -> Result<TypedValue, MarshalError> {
        (self.from_json)(json).map_err(|e| MarshalError::Decode {
            target: self.name,
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self, value: &TypedValue) -> Result<JsonValue, MarshalError> {
        (self.to_json)(value)
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetType").field(&self.name).finish()
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

type AdapterFn = dyn Fn(JsonValue) -> Result<JsonValue, String> + Send + Sync;

/// A JSON-to-JSON rewrite applied before decoding and after encoding.
#[derive(Clone)]
pub struct JsonAdapter {
    name: String,
    apply: Arc<AdapterFn>,
}

impl JsonAdapter {
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(JsonValue) -> Result<JsonValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Replaces the document with the value at `pointer` (RFC 6901), e.g. `/data/items`.
    pub fn unwrap_pointer(pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        let name = format!("unwrap {pointer}");
        Self::new(name, move |json| {
            json.pointer(&pointer)
                .cloned()
                .ok_or_else(|| format!("no value at '{pointer}'"))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, json: JsonValue) -> Result<JsonValue, MarshalError> {
        (self.apply)(json).map_err(|reason| MarshalError::Adapter {
            name: self.name.clone(),
            reason,
        })
    }
}

impl fmt::Debug for JsonAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonAdapter").field(&self.name).finish()
    }
}

pub trait Marshaller: Send + Sync {
    fn decode(
        &self,
        body: &[u8],
        target: &TargetType,
        adapters: &[JsonAdapter],
    ) -> Result<TypedValue, MarshalError>;

    fn encode(
        &self,
        value: &TypedValue,
        target: &TargetType,
        adapters: &[JsonAdapter],
    ) -> Result<Vec<u8>, MarshalError>;
}

/// serde_json-backed gateway; an empty body decodes from `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaller;

impl Marshaller for JsonMarshaller {
    fn decode(
        &self,
        body: &[u8],
        target: &TargetType,
        adapters: &[JsonAdapter],
    ) -> Result<TypedValue, MarshalError> {
        let mut json = parse_json(body)?;
        for adapter in adapters {
            json = adapter.apply(json)?;
        }
        target.from_json(json)
    }

    fn encode(
        &self,
        value: &TypedValue,
        target: &TargetType,
        adapters: &[JsonAdapter],
    ) -> Result<Vec<u8>, MarshalError> {
        let mut json = target.to_json(value)?;
        for adapter in adapters {
            json = adapter.apply(json)?;
        }
        serde_json::to_vec(&json).map_err(|e| MarshalError::Encode {
            target: target.name(),
            reason: e.to_string(),
        })
    }
}

pub(crate) fn parse_json(body: &[u8]) -> Result<JsonValue, MarshalError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Null);
    }
    serde_json::from_slice(body).map_err(|e| MarshalError::InvalidJson(e.to_string()))
}

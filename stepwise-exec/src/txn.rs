use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::http::{HttpRequest, HttpResponse};
use crate::marshal::{parse_json, JsonAdapter, JsonMarshaller, MarshalError, Marshaller, TargetType, TypedValue};

/// An HTTP message with a body that can be viewed as JSON or decoded.
pub trait Message {
    fn body(&self) -> &[u8];
}

impl Message for HttpRequest {
    fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Message for HttpResponse {
    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Decodes are keyed by target type and the adapter chain applied before decoding.
type DecodeKey = (TypeId, Vec<String>);
type DecodeCache = HashMap<DecodeKey, Result<TypedValue, MarshalError>>;

/// A captured request or response with lazily computed views.
///
/// The JSON view is parsed on first access. Typed views are decoded at most once per target
/// type and adapter chain; every later request for the same pair returns the same `Arc`,
/// including a cached decode error.
pub struct TxnInfo<M> {
    message: M,
    marshaller: Arc<dyn Marshaller>,
    json: OnceLock<Option<JsonValue>>,
    decoded: Mutex<DecodeCache>,
}

impl<M: Message> TxnInfo<M> {
    pub fn new(message: M, marshaller: Arc<dyn Marshaller>) -> Self {
        Self {
            message,
            marshaller,
            json: OnceLock::new(),
            decoded: Mutex::new(HashMap::new()),
        }
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn body(&self) -> &[u8] {
        self.message.body()
    }

    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.message.body())
    }

    /// `None` when the body is not JSON.
    pub fn json(&self) -> Option<&JsonValue> {
        self.json
            .get_or_init(|| parse_json(self.message.body()).ok())
            .as_ref()
    }

    pub fn decode_target(
        &self,
        target: &TargetType,
        adapters: &[JsonAdapter],
    ) -> Result<TypedValue, MarshalError> {
        let key = (
            target.type_id(),
            adapters.iter().map(|a| a.name().to_string()).collect(),
        );
        let mut cache = self.decoded.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(key)
            .or_insert_with(|| self.marshaller.decode(self.message.body(), target, adapters))
            .clone()
    }

    pub fn decode<T>(&self) -> Result<Arc<T>, MarshalError>
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let value = self.decode_target(&TargetType::of::<T>(), &[])?;
        value
            .downcast::<T>()
            .map_err(|_| MarshalError::TypeMismatch { expected: std::any::type_name::<T>() })
    }

    /// Typed view only if some earlier adapter-free decode of `T` succeeded.
    pub fn typed<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.typed_with::<T>(&[])
    }

    /// Typed view from an earlier successful decode of `T` through the named adapters.
    pub fn typed_with<T: Any + Send + Sync>(&self, adapter_names: &[&str]) -> Option<Arc<T>> {
        let key = (
            TypeId::of::<T>(),
            adapter_names.iter().map(|n| n.to_string()).collect(),
        );
        let cache = self.decoded.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(&key) {
            Some(Ok(value)) => value.clone().downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl<M: Message> From<M> for TxnInfo<M> {
    fn from(message: M) -> Self {
        Self::new(message, Arc::new(JsonMarshaller))
    }
}

impl<M: Clone> Clone for TxnInfo<M> {
    fn clone(&self) -> Self {
        let cache = self.decoded.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Self {
            message: self.message.clone(),
            marshaller: self.marshaller.clone(),
            json: self.json.clone(),
            decoded: Mutex::new(cache),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for TxnInfo<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnInfo").field("message", &self.message).finish_non_exhaustive()
    }
}

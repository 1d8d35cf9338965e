use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;
use stepwise_core::Environment;

use crate::marshal::{JsonAdapter, TargetType, TypedValue};
use crate::selector::Selector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Success,
    Failure(String),
}

impl ValidationVerdict {
    pub fn from_bool(ok: bool, reason: impl Into<String>) -> Self {
        if ok {
            ValidationVerdict::Success
        } else {
            ValidationVerdict::Failure(reason.into())
        }
    }
}

/// What a validator sees: the decoded value when the config names a target type, and the
/// body's JSON view when the body is JSON.
pub struct ValidationInput<'a> {
    pub typed: Option<&'a TypedValue>,
    pub json: Option<&'a JsonValue>,
    pub environment: &'a Environment,
}

type ValidatorFn = dyn Fn(&ValidationInput<'_>) -> ValidationVerdict + Send + Sync;

#[derive(Clone)]
pub struct Validator {
    description: String,
    check: Arc<ValidatorFn>,
}

impl Validator {
    /// Validates the decoded value; fails if the config did not decode a `T`.
    pub fn new<T, F>(check: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> ValidationVerdict + Send + Sync + 'static,
    {
        Self::raw(format!("typed<{}>", type_name::<T>()), move |input| {
            match input.typed.and_then(|v| v.downcast_ref::<T>()) {
                Some(value) => check(value),
                None => ValidationVerdict::Failure(format!(
                    "no decoded {} to validate",
                    type_name::<T>()
                )),
            }
        })
    }

    pub fn predicate<T, F>(reason: impl Into<String>, check: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let reason = reason.into();
        Self::new(move |value: &T| ValidationVerdict::from_bool(check(value), reason.clone()))
    }

    pub fn raw<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ValidationInput<'_>) -> ValidationVerdict + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// At least one node matches `path` in the JSON body.
    pub fn json_path_exists(path: &str) -> Result<Self, serde_json_path::ParseError> {
        let compiled = JsonPath::parse(path)?;
        let path = path.to_string();
        Ok(Self::raw(format!("exists({path})"), move |input| {
            let found = input
                .json
                .is_some_and(|json| !compiled.query(json).all().is_empty());
            ValidationVerdict::from_bool(found, format!("no match for {path}"))
        }))
    }

    /// The first node at `path` equals `expected`.
    pub fn json_path_equals(path: &str, expected: JsonValue) -> Result<Self, serde_json_path::ParseError> {
        let compiled = JsonPath::parse(path)?;
        let path = path.to_string();
        Ok(Self::raw(format!("{path} == {expected}"), move |input| {
            let actual = input
                .json
                .and_then(|json| compiled.query(json).all().first().map(|v| (*v).clone()));
            match actual {
                Some(actual) if actual == expected => ValidationVerdict::Success,
                Some(actual) => ValidationVerdict::Failure(format!(
                    "{path} was {actual}, expected {expected}"
                )),
                None => ValidationVerdict::Failure(format!("no match for {path}")),
            }
        }))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn check(&self, input: &ValidationInput<'_>) -> ValidationVerdict {
        (self.check)(input)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.description).finish()
    }
}

/// Which responses a `ResponseConfig` applies to, judged by the accepted status range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponseOutcome {
    Success,
    Error,
    Any,
}

impl ResponseOutcome {
    pub fn admits(self, accepted: bool) -> bool {
        match self {
            ResponseOutcome::Success => accepted,
            ResponseOutcome::Error => !accepted,
            ResponseOutcome::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseConfig {
    pub selector: Selector,
    pub outcome: ResponseOutcome,
    pub target: Option<TargetType>,
    pub adapters: Vec<JsonAdapter>,
    pub validator: Option<Validator>,
}

impl ResponseConfig {
    pub fn on_success(selector: Selector) -> Self {
        Self::on(selector, ResponseOutcome::Success)
    }

    pub fn on_error(selector: Selector) -> Self {
        Self::on(selector, ResponseOutcome::Error)
    }

    pub fn on_any_status(selector: Selector) -> Self {
        Self::on(selector, ResponseOutcome::Any)
    }

    fn on(selector: Selector, outcome: ResponseOutcome) -> Self {
        Self {
            selector,
            outcome,
            target: None,
            adapters: Vec::new(),
            validator: None,
        }
    }

    pub fn decode_as<T>(mut self) -> Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        self.target = Some(TargetType::of::<T>());
        self
    }

    pub fn with_adapter(mut self, adapter: JsonAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub selector: Selector,
    pub target: Option<TargetType>,
    pub adapters: Vec<JsonAdapter>,
    pub validator: Option<Validator>,
}

impl RequestConfig {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            target: None,
            adapters: Vec::new(),
            validator: None,
        }
    }

    pub fn decode_as<T>(mut self) -> Self
    where
        T: DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        self.target = Some(TargetType::of::<T>());
        self
    }

    pub fn with_adapter(mut self, adapter: JsonAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

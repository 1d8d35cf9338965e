#![forbid(unsafe_code)]

//! Runtime engine for stepwise collection runs.
//!
//! Steps come from `stepwise-core`; this crate dispatches them, runs hooks and typed
//! validation, polls for asynchronous side effects, and applies the halt policy.

pub mod config;
pub mod engine;
pub mod events;
pub mod halt;
pub mod http;
pub mod marshal;
pub mod report;
pub mod rundown;
pub mod script;
pub mod selector;
pub mod txn;

pub use crate::config::{
    ConfigError, HookConfig, HookError, LoggingConfig, PollContext, PollingConfig, RequestConfig,
    ResponseConfig, ResponseOutcome, RunConfig, StepFilter, ValidationInput, ValidationVerdict,
    Validator,
};
pub use crate::engine::Engine;
pub use crate::events::{
    CompositeEventSink, EventSink, NoOpEventSink, RunEvent, StdoutEventSink, TracingEventSink,
};
pub use crate::halt::{HaltOn, HaltPolicy, IGNORE_FAILURE_TAG};
pub use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use crate::marshal::{JsonAdapter, JsonMarshaller, MarshalError, Marshaller, TargetType, TypedValue};
pub use crate::report::{FailureKind, PollOutcome, PollingReport, StepFailure, StepReport};
pub use crate::rundown::{RunStatus, RunSummary, Rundown, StepSummary};
pub use crate::script::{ScriptContext, ScriptEvaluator};
pub use crate::selector::Selector;
pub use crate::txn::{Message, TxnInfo};

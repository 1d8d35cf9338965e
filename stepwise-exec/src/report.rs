use std::fmt;
use std::time::Duration;

use serde::Serialize;
use stepwise_core::{Environment, Step};

use crate::http::{HttpRequest, HttpResponse};
use crate::txn::TxnInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    UnresolvedVariable,
    PreStepHookFailure,
    TransportFailure,
    HttpStatusFailure,
    PostStepHookFailure,
    RequestMarshallingFailure,
    RequestValidationFailure,
    ResponseMarshallingFailure,
    ResponseValidationFailure,
    PollTimedOut,
    PollRequestFailure,
}

impl FailureKind {
    pub const ALL: [FailureKind; 11] = [
        FailureKind::UnresolvedVariable,
        FailureKind::PreStepHookFailure,
        FailureKind::TransportFailure,
        FailureKind::HttpStatusFailure,
        FailureKind::PostStepHookFailure,
        FailureKind::RequestMarshallingFailure,
        FailureKind::RequestValidationFailure,
        FailureKind::ResponseMarshallingFailure,
        FailureKind::ResponseValidationFailure,
        FailureKind::PollTimedOut,
        FailureKind::PollRequestFailure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::UnresolvedVariable => "unresolved-variable",
            FailureKind::PreStepHookFailure => "pre-step-hook-failure",
            FailureKind::TransportFailure => "transport-failure",
            FailureKind::HttpStatusFailure => "http-status-failure",
            FailureKind::PostStepHookFailure => "post-step-hook-failure",
            FailureKind::RequestMarshallingFailure => "request-marshalling-failure",
            FailureKind::RequestValidationFailure => "request-validation-failure",
            FailureKind::ResponseMarshallingFailure => "response-marshalling-failure",
            FailureKind::ResponseValidationFailure => "response-validation-failure",
            FailureKind::PollTimedOut => "poll-timed-out",
            FailureKind::PollRequestFailure => "poll-request-failure",
        }
    }

    pub fn parse(s: &str) -> Option<FailureKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub cause: String,
}

impl StepFailure {
    pub fn new(kind: FailureKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.cause)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollOutcome {
    Satisfied,
    TimedOut,
    RequestFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollingReport {
    pub attempts: u32,
    #[serde(serialize_with = "serialize_millis")]
    pub total_duration: Duration,
    pub outcome: PollOutcome,
    #[serde(skip)]
    pub responses: Vec<HttpResponse>,
}

impl PollingReport {
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.responses.last()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Outcome of one executed step; built once after every stage for the step has run.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    /// `None` when the request could not be resolved.
    pub request: Option<TxnInfo<HttpRequest>>,
    pub response: Option<TxnInfo<HttpResponse>>,
    pub failure: Option<StepFailure>,
    pub polling: Option<PollingReport>,
    /// Failed, but matched a halt exception selector.
    pub ignored_for_failure: bool,
    pub env_snapshot: Environment,
}

impl StepReport {
    pub fn is_successful(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.message().status)
    }
}

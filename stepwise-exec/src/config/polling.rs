use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use stepwise_core::{Environment, RequestTemplate, Step, VariableResolver};

use super::HookError;
use crate::http::{HttpRequest, HttpResponse};
use crate::selector::Selector;
use crate::txn::TxnInfo;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs available when building each poll request.
pub struct PollContext<'a> {
    pub step: &'a Step,
    pub request: &'a TxnInfo<HttpRequest>,
    pub response: &'a TxnInfo<HttpResponse>,
    pub environment: &'a Environment,
    /// The run's resolver, carrying its dynamic variables.
    pub resolver: &'a VariableResolver,
}

impl PollContext<'_> {
    /// Resolves `template` against a copy of the environment; generated values are not kept.
    pub fn resolve(&self, template: &RequestTemplate) -> Result<HttpRequest, HookError> {
        let mut scratch = self.environment.clone();
        let resolved = self.resolver.resolve_request(template, &mut scratch)?;
        Ok(resolved.into())
    }
}

type RequestBuilderFn = dyn Fn(&PollContext<'_>) -> Result<HttpRequest, HookError> + Send + Sync;
type StopPredicateFn =
    dyn Fn(&TxnInfo<HttpResponse>, &Environment) -> Result<bool, HookError> + Send + Sync;

/// Repeats a side query after a successful step until `until` holds or `timeout` elapses.
#[derive(Clone)]
pub struct PollingConfig {
    pub selector: Selector,
    pub interval: Duration,
    pub timeout: Duration,
    request_builder: Arc<RequestBuilderFn>,
    until: Arc<StopPredicateFn>,
}

impl PollingConfig {
    pub fn new<B, P>(selector: Selector, request_builder: B, until: P) -> Self
    where
        B: Fn(&PollContext<'_>) -> Result<HttpRequest, HookError> + Send + Sync + 'static,
        P: Fn(&TxnInfo<HttpResponse>, &Environment) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        Self {
            selector,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            request_builder: Arc::new(request_builder),
            until: Arc::new(until),
        }
    }

    /// Polls a templated request, e.g. `GET {{baseUrl}}/jobs/{{jobId}}`.
    pub fn from_template<P>(selector: Selector, template: RequestTemplate, until: P) -> Self
    where
        P: Fn(&TxnInfo<HttpResponse>, &Environment) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        Self::new(selector, move |ctx| ctx.resolve(&template), until)
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_request(&self, ctx: &PollContext<'_>) -> Result<HttpRequest, HookError> {
        (self.request_builder)(ctx)
    }

    pub fn is_satisfied(&self, response: &TxnInfo<HttpResponse>, env: &Environment) -> Result<bool, HookError> {
        (self.until)(response, env)
    }
}

impl fmt::Debug for PollingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingConfig")
            .field("selector", &self.selector)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

use std::sync::Arc;
use std::time::Duration;

use stepwise_core::{Environment, Step, VariableResolver};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::dispatch;
use super::hooks::guarded;
use crate::config::{LoggingConfig, PollContext, PollingConfig};
use crate::events::{EventSink, RunEvent};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::marshal::Marshaller;
use crate::report::{FailureKind, PollOutcome, PollingReport, StepFailure};
use crate::txn::TxnInfo;

pub(crate) struct Poller<'a> {
    pub http: &'a dyn HttpClient,
    pub marshaller: &'a Arc<dyn Marshaller>,
    pub event_sink: &'a dyn EventSink,
    pub http_timeout: Duration,
    pub logging: &'a LoggingConfig,
    pub resolver: &'a VariableResolver,
}

impl Poller<'_> {
    /// Polls until the stop predicate holds or the timeout elapses.
    ///
    /// The first poll is sent immediately; each later poll waits one interval. The timeout is
    /// checked after each wait, so a 5s timeout with a 2s interval polls at t=0, 2 and 4.
    /// Only a failure to build or send a poll request ends polling early.
    pub(crate) async fn run(
        &self,
        config: &PollingConfig,
        step: &Step,
        request: &TxnInfo<HttpRequest>,
        response: &TxnInfo<HttpResponse>,
        environment: &Environment,
    ) -> (PollingReport, Option<StepFailure>) {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut responses = Vec::new();

        let result: Result<PollOutcome, String> = loop {
            attempts += 1;
            let ctx = PollContext {
                step,
                request,
                response,
                environment,
                resolver: self.resolver,
            };
            let poll_request = match guarded(|| config.build_request(&ctx)) {
                Ok(req) => req,
                Err(cause) => break Err(format!("building poll request: {cause}")),
            };
            debug!(step = %step, attempt = attempts, url = %poll_request.url, "polling");

            let poll_response =
                match dispatch::send(self.http, &poll_request, self.http_timeout, self.logging).await {
                    Ok(resp) => TxnInfo::new(resp, self.marshaller.clone()),
                    Err(err) => break Err(format!("poll request failed: {err}")),
                };
            // A failing predicate means "not yet"; polling goes on until the timeout.
            let satisfied = match guarded(|| config.is_satisfied(&poll_response, environment)) {
                Ok(satisfied) => satisfied,
                Err(cause) => {
                    warn!(step = %step, attempt = attempts, %cause, "stop predicate failed; treated as not satisfied");
                    false
                }
            };
            responses.push(poll_response.message().clone());

            self.event_sink
                .emit(RunEvent::PollAttempt {
                    index: step.index.clone(),
                    attempt: attempts,
                    satisfied,
                })
                .await;
            if satisfied {
                break Ok(PollOutcome::Satisfied);
            }

            sleep(config.interval).await;
            if started.elapsed() >= config.timeout {
                break Ok(PollOutcome::TimedOut);
            }
        };

        let total_duration = started.elapsed();
        let (outcome, failure) = match result {
            Ok(PollOutcome::Satisfied) => {
                info!(step = %step, attempts, "polling satisfied");
                (PollOutcome::Satisfied, None)
            }
            Ok(outcome) => {
                warn!(step = %step, attempts, timeout = ?config.timeout, "polling timed out");
                let cause = format!(
                    "stop predicate not satisfied after {attempts} polls within {:?}",
                    config.timeout
                );
                (outcome, Some(StepFailure::new(FailureKind::PollTimedOut, cause)))
            }
            Err(cause) => {
                warn!(step = %step, attempts, %cause, "polling failed");
                (
                    PollOutcome::RequestFailed,
                    Some(StepFailure::new(FailureKind::PollRequestFailure, cause)),
                )
            }
        };

        let report = PollingReport {
            attempts,
            total_duration,
            outcome,
            responses,
        };
        (report, failure)
    }
}

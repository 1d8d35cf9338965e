//! Sequential run orchestration.
//!
//! Each step goes through: resolve, pre-hooks, dispatch, status check, post-hooks, request
//! configs, response configs, polling, report, halt check.

mod configs;
mod dispatch;
mod hooks;
mod polling;

use std::sync::Arc;

use stepwise_core::{Step, VariableResolver};
use tracing::{info, warn};

use crate::config::{ConfigError, RunConfig};
use crate::events::{EventSink, RunEvent, TracingEventSink};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::marshal::{JsonMarshaller, Marshaller};
use crate::report::{FailureKind, PollingReport, StepFailure, StepReport};
use crate::rundown::{RunStatus, Rundown};
use crate::txn::TxnInfo;

use self::polling::Poller;

pub struct Engine {
    http: Arc<dyn HttpClient>,
    marshaller: Arc<dyn Marshaller>,
    event_sink: Arc<dyn EventSink>,
}

/// Everything gathered for one step before its report is built.
#[derive(Default)]
struct StepOutcome {
    request: Option<TxnInfo<HttpRequest>>,
    response: Option<TxnInfo<HttpResponse>>,
    failure: Option<StepFailure>,
    polling: Option<PollingReport>,
}

impl StepOutcome {
    fn fail(&mut self, kind: FailureKind, cause: impl Into<String>) {
        if self.failure.is_none() {
            self.failure = Some(StepFailure::new(kind, cause));
        }
    }
}

impl Engine {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            marshaller: Arc::new(JsonMarshaller),
            event_sink: Arc::new(TracingEventSink),
        }
    }

    pub fn with_marshaller(mut self, marshaller: Arc<dyn Marshaller>) -> Self {
        self.marshaller = marshaller;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Runs `steps` in order and returns the rundown.
    ///
    /// Only configuration errors are returned as `Err`; every step-level failure is recorded in
    /// its report.
    pub async fn run(&self, steps: &[Step], config: RunConfig) -> Result<Rundown, ConfigError> {
        config.validate()?;

        let resolver = VariableResolver::new(config.dynamic_variables.clone());
        let mut rundown = Rundown::new(config.environment.clone());
        let selected: Vec<&Step> = steps.iter().filter(|s| config.step_filter.includes(s)).collect();
        if selected.len() < steps.len() {
            info!(skipped = steps.len() - selected.len(), "steps excluded by filter");
        }

        self.event_sink
            .emit(RunEvent::RunStarted {
                total_steps: selected.len(),
            })
            .await;

        let mut status = RunStatus::Completed;
        for step in selected {
            self.event_sink
                .emit(RunEvent::StepStarted {
                    index: step.index.clone(),
                    name: step.display_path(),
                })
                .await;

            let outcome = self.run_step(step, &config, &resolver, &mut rundown).await;
            let ignored_for_failure = outcome.failure.is_some()
                && config
                    .halt_policy
                    .is_exempt(step, outcome.request.as_ref(), &rundown);
            let report = StepReport {
                step: step.clone(),
                request: outcome.request,
                response: outcome.response,
                failure: outcome.failure,
                polling: outcome.polling,
                ignored_for_failure,
                env_snapshot: rundown.environment().clone(),
            };
            let halt = config.halt_policy.should_halt(&report);
            let failure = report.failure_kind();
            if let Some(f) = &report.failure {
                warn!(step = %step, failure = %f.kind, cause = %f.cause, ignored = ignored_for_failure, "step failed");
            }
            rundown.push(report);

            self.event_sink
                .emit(RunEvent::StepFinished {
                    index: step.index.clone(),
                    name: step.display_path(),
                    failure,
                    ignored: ignored_for_failure,
                })
                .await;

            if halt {
                if let Some(kind) = failure {
                    self.event_sink
                        .emit(RunEvent::Halted {
                            index: step.index.clone(),
                            kind,
                        })
                        .await;
                }
                status = RunStatus::Halted;
                break;
            }
        }

        rundown.finish(status);
        self.event_sink
            .emit(RunEvent::RunFinished {
                status,
                executed: rundown.step_reports().len(),
            })
            .await;
        Ok(rundown)
    }

    async fn run_step(
        &self,
        step: &Step,
        config: &RunConfig,
        resolver: &VariableResolver,
        rundown: &mut Rundown,
    ) -> StepOutcome {
        let mut outcome = StepOutcome::default();

        let resolved = match resolver.resolve_request(&step.request, rundown.environment_mut()) {
            Ok(resolved) => resolved,
            Err(err) => {
                outcome.fail(FailureKind::UnresolvedVariable, err.to_string());
                return outcome;
            }
        };
        let request = TxnInfo::new(HttpRequest::from(resolved), self.marshaller.clone());

        if let Err(cause) = hooks::run_pre_hooks(&config.hooks, step, &request, rundown) {
            outcome.fail(FailureKind::PreStepHookFailure, cause);
            outcome.request = Some(request);
            return outcome;
        }

        let response = match dispatch::send(
            self.http.as_ref(),
            request.message(),
            config.http_timeout,
            &config.logging,
        )
        .await
        {
            Ok(resp) => TxnInfo::new(resp, self.marshaller.clone()),
            Err(err) => {
                outcome.fail(FailureKind::TransportFailure, err.to_string());
                outcome.request = Some(request);
                return outcome;
            }
        };

        let status = response.message().status;
        let accepted = config.is_accepted(status);
        if !accepted {
            let range = config
                .accepted_status
                .as_ref()
                .map(|r| format!("{}..={}", r.start(), r.end()))
                .unwrap_or_default();
            outcome.fail(
                FailureKind::HttpStatusFailure,
                format!("status {status} outside accepted range {range}"),
            );
        }

        if let Err(cause) = hooks::run_post_hooks(&config.hooks, step, &request, &response, rundown) {
            outcome.fail(FailureKind::PostStepHookFailure, cause);
        }
        if let Err(failure) = configs::apply_request_configs(&config.request_configs, step, &request, rundown) {
            outcome.fail(failure.kind, failure.cause);
        }
        if let Err(failure) = configs::apply_response_configs(
            &config.response_configs,
            step,
            &request,
            &response,
            accepted,
            rundown,
        ) {
            outcome.fail(failure.kind, failure.cause);
        }

        if outcome.failure.is_none() {
            let matching = config
                .polling_configs
                .iter()
                .find(|p| p.selector.matches(step, Some(&request), rundown));
            if let Some(polling_config) = matching {
                let poller = Poller {
                    http: self.http.as_ref(),
                    marshaller: &self.marshaller,
                    event_sink: self.event_sink.as_ref(),
                    http_timeout: config.http_timeout,
                    logging: &config.logging,
                    resolver,
                };
                let (report, failure) = poller
                    .run(polling_config, step, &request, &response, rundown.environment())
                    .await;
                outcome.polling = Some(report);
                outcome.failure = failure;
            }
        }

        outcome.request = Some(request);
        outcome.response = Some(response);
        outcome
    }
}

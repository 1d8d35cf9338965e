mod hooks;
mod logging;
mod marshalling;
mod polling;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::time::Duration;

use stepwise_core::{DynamicVariables, Environment, Step};

pub use hooks::{Hook, HookConfig, HookError, PostHookFn, PreHookFn};
pub use logging::LoggingConfig;
pub use marshalling::{
    RequestConfig, ResponseConfig, ResponseOutcome, ValidationInput, ValidationVerdict, Validator,
};
pub use polling::{PollContext, PollingConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};

use crate::halt::HaltPolicy;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("steps both run-only and skipped: {}", steps.join(", "))]
    OverlappingStepFilter { steps: Vec<String> },
    #[error("duplicate {kind} config for selector {selector}")]
    DuplicateConfig { kind: &'static str, selector: String },
    #[error("invalid polling config for {selector}: {reason}")]
    InvalidPolling { selector: String, reason: String },
}

/// Restricts which steps run; names match like `Step::name_matches`.
///
/// An empty `run_only` admits every step not listed in `skip`.
#[derive(Debug, Clone, Default)]
pub struct StepFilter {
    pub run_only: BTreeSet<String>,
    pub skip: BTreeSet<String>,
}

impl StepFilter {
    pub fn run_only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            run_only: names.into_iter().map(Into::into).collect(),
            skip: BTreeSet::new(),
        }
    }

    pub fn skip<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            run_only: BTreeSet::new(),
            skip: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes(&self, step: &Step) -> bool {
        if self.skip.iter().any(|n| step.name_matches(n)) {
            return false;
        }
        self.run_only.is_empty() || self.run_only.iter().any(|n| step.name_matches(n))
    }
}

/// Everything that shapes one run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub environment: Environment,
    pub dynamic_variables: DynamicVariables,
    pub hooks: Vec<HookConfig>,
    pub request_configs: Vec<RequestConfig>,
    pub response_configs: Vec<ResponseConfig>,
    pub polling_configs: Vec<PollingConfig>,
    pub halt_policy: HaltPolicy,
    pub step_filter: StepFilter,
    /// `None` accepts every status.
    pub accepted_status: Option<RangeInclusive<u16>>,
    pub http_timeout: Duration,
    pub logging: LoggingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: Environment::new(),
            dynamic_variables: DynamicVariables::new(),
            hooks: Vec::new(),
            request_configs: Vec::new(),
            response_configs: Vec::new(),
            polling_configs: Vec::new(),
            halt_policy: HaltPolicy::default(),
            step_filter: StepFilter::default(),
            accepted_status: Some(200..=299),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_dynamic_variables(mut self, dynamic_variables: DynamicVariables) -> Self {
        self.dynamic_variables = dynamic_variables;
        self
    }

    pub fn with_hook(mut self, hook: HookConfig) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_request_config(mut self, config: RequestConfig) -> Self {
        self.request_configs.push(config);
        self
    }

    pub fn with_response_config(mut self, config: ResponseConfig) -> Self {
        self.response_configs.push(config);
        self
    }

    pub fn with_polling(mut self, config: PollingConfig) -> Self {
        self.polling_configs.push(config);
        self
    }

    pub fn with_halt_policy(mut self, halt_policy: HaltPolicy) -> Self {
        self.halt_policy = halt_policy;
        self
    }

    pub fn with_step_filter(mut self, step_filter: StepFilter) -> Self {
        self.step_filter = step_filter;
        self
    }

    pub fn with_accepted_status(mut self, accepted: Option<RangeInclusive<u16>>) -> Self {
        self.accepted_status = accepted;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn is_accepted(&self, status: u16) -> bool {
        self.accepted_status
            .as_ref()
            .map_or(true, |range| range.contains(&status))
    }

    /// Rejects configs the engine could only resolve by guessing.
    ///
    /// Duplicate detection only sees selectors with a fingerprint; two opaque closures are
    /// never considered equal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let overlap: Vec<String> = self
            .step_filter
            .run_only
            .intersection(&self.step_filter.skip)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(ConfigError::OverlappingStepFilter { steps: overlap });
        }

        let mut seen = BTreeSet::new();
        for config in &self.request_configs {
            if let Some(fp) = config.selector.fingerprint() {
                if !seen.insert(fp.to_string()) {
                    return Err(ConfigError::DuplicateConfig {
                        kind: "request",
                        selector: fp.to_string(),
                    });
                }
            }
        }

        let mut seen: BTreeMap<ResponseOutcome, BTreeSet<String>> = BTreeMap::new();
        for config in &self.response_configs {
            if let Some(fp) = config.selector.fingerprint() {
                if !seen.entry(config.outcome).or_default().insert(fp.to_string()) {
                    return Err(ConfigError::DuplicateConfig {
                        kind: "response",
                        selector: fp.to_string(),
                    });
                }
            }
        }

        for config in &self.polling_configs {
            let reason = if config.interval.is_zero() {
                Some("interval must be positive")
            } else if config.timeout.is_zero() {
                Some("timeout must be positive")
            } else if config.interval > config.timeout {
                Some("interval exceeds timeout")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidPolling {
                    selector: config.selector.description().to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

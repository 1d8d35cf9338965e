use serde::Serialize;
use stepwise_core::Environment;

use crate::report::{FailureKind, StepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Halted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Halted => "halted",
        }
    }
}

/// Ordered step reports plus the run environment.
///
/// Reports are append-only and only the engine can append. Hooks receive `&mut Rundown`
/// to read earlier reports and write the environment.
#[derive(Debug, Clone)]
pub struct Rundown {
    reports: Vec<StepReport>,
    environment: Environment,
    status: RunStatus,
}

impl Rundown {
    pub fn new(environment: Environment) -> Self {
        Self {
            reports: Vec::new(),
            environment,
            status: RunStatus::Running,
        }
    }

    pub(crate) fn push(&mut self, report: StepReport) {
        self.reports.push(report);
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
    }

    pub fn step_reports(&self) -> &[StepReport] {
        &self.reports
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn first_unsuccessful_step_report(&self) -> Option<&StepReport> {
        self.reports.iter().find(|r| !r.is_successful())
    }

    /// First failure that did not match a halt exception.
    pub fn first_unignored_unsuccessful_step_report(&self) -> Option<&StepReport> {
        self.reports
            .iter()
            .find(|r| !r.is_successful() && !r.ignored_for_failure)
    }

    pub fn are_all_steps_successful(&self) -> bool {
        self.reports.iter().all(StepReport::is_successful)
    }

    pub fn are_all_steps_except_ignored_successful(&self) -> bool {
        self.first_unignored_unsuccessful_step_report().is_none()
    }

    pub fn report_for_step_name(&self, step_name: &str) -> Option<&StepReport> {
        self.reports.iter().find(|r| r.step.name_matches(step_name))
    }

    pub fn reports_in_folder<'a>(&'a self, folder_path: &'a str) -> impl Iterator<Item = &'a StepReport> + 'a {
        self.reports.iter().filter(move |r| r.step.in_folder(folder_path))
    }

    pub fn are_all_steps_in_folder_successful(&self, folder_path: &str) -> bool {
        self.reports_in_folder(folder_path).all(StepReport::is_successful)
    }

    pub fn reports_excluding<'a>(
        &'a self,
        step_names: &'a [&'a str],
    ) -> impl Iterator<Item = &'a StepReport> + 'a {
        self.reports
            .iter()
            .filter(move |r| !step_names.iter().any(|n| r.step.name_matches(n)))
    }

    pub fn reports_including<'a>(
        &'a self,
        step_names: &'a [&'a str],
    ) -> impl Iterator<Item = &'a StepReport> + 'a {
        self.reports
            .iter()
            .filter(move |r| step_names.iter().any(|n| r.step.name_matches(n)))
    }

    pub fn summary(&self) -> RunSummary {
        let steps: Vec<StepSummary> = self.reports.iter().map(StepSummary::from).collect();
        let failed = steps.iter().filter(|s| s.failure.is_some()).count();
        let ignored = steps.iter().filter(|s| s.ignored_for_failure).count();
        RunSummary {
            status: self.status,
            executed: steps.len(),
            succeeded: steps.len() - failed,
            failed,
            ignored,
            steps,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub ignored: usize,
    pub steps: Vec<StepSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub index: String,
    pub name: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub ignored_for_failure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_attempts: Option<u32>,
}

impl From<&StepReport> for StepSummary {
    fn from(r: &StepReport) -> Self {
        Self {
            index: r.step.index.clone(),
            name: r.step.display_path(),
            method: r.step.method().to_string(),
            url: r.request.as_ref().map(|t| t.message().url.clone()),
            http_status: r.status(),
            failure: r.failure_kind(),
            cause: r.failure.as_ref().map(|f| f.cause.clone()),
            ignored_for_failure: r.ignored_for_failure,
            poll_attempts: r.polling.as_ref().map(|p| p.attempts),
        }
    }
}

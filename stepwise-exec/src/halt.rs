use std::collections::BTreeSet;

use stepwise_core::Step;

use crate::http::HttpRequest;
use crate::report::{FailureKind, StepReport};
use crate::rundown::Rundown;
use crate::selector::Selector;
use crate::txn::TxnInfo;

/// Tag that exempts a step from halting when used with `Selector::tagged`.
pub const IGNORE_FAILURE_TAG: &str = "ignore-failure";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltOn {
    Never,
    AnyFailure,
    FailureKinds(BTreeSet<FailureKind>),
}

impl HaltOn {
    pub fn covers(&self, kind: FailureKind) -> bool {
        match self {
            HaltOn::Never => false,
            HaltOn::AnyFailure => true,
            HaltOn::FailureKinds(kinds) => kinds.contains(&kind),
        }
    }
}

/// Decides whether a failed step stops the run.
///
/// Steps matching an exception selector never halt; their reports still carry the failure
/// and are flagged `ignored_for_failure`.
#[derive(Debug, Clone)]
pub struct HaltPolicy {
    pub halt_on: HaltOn,
    pub exceptions: Vec<Selector>,
}

impl Default for HaltPolicy {
    fn default() -> Self {
        Self {
            halt_on: HaltOn::AnyFailure,
            exceptions: Vec::new(),
        }
    }
}

impl HaltPolicy {
    pub fn never() -> Self {
        Self {
            halt_on: HaltOn::Never,
            exceptions: Vec::new(),
        }
    }

    pub fn on_kinds(kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        Self {
            halt_on: HaltOn::FailureKinds(kinds.into_iter().collect()),
            exceptions: Vec::new(),
        }
    }

    pub fn except(mut self, selector: Selector) -> Self {
        self.exceptions.push(selector);
        self
    }

    pub fn is_exempt(
        &self,
        step: &Step,
        request: Option<&TxnInfo<HttpRequest>>,
        rundown: &Rundown,
    ) -> bool {
        self.exceptions.iter().any(|s| s.matches(step, request, rundown))
    }

    pub fn should_halt(&self, report: &StepReport) -> bool {
        match report.failure_kind() {
            Some(kind) => !report.ignored_for_failure && self.halt_on.covers(kind),
            None => false,
        }
    }
}

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use stepwise_core::Step;
use tracing::warn;

use crate::http::HttpRequest;
use crate::rundown::Rundown;
use crate::txn::TxnInfo;

type Predicate = dyn Fn(&Step, Option<&TxnInfo<HttpRequest>>, &Rundown) -> bool + Send + Sync;

/// Pure predicate deciding whether a hook, config, or halt exception applies to a step.
///
/// `request` is `None` when the step's request could not be resolved.
#[derive(Clone)]
pub struct Selector {
    description: String,
    /// Equal fingerprints select exactly the same steps; `None` for opaque closures.
    fingerprint: Option<String>,
    predicate: Arc<Predicate>,
}

impl Selector {
    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Step, Option<&TxnInfo<HttpRequest>>, &Rundown) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            fingerprint: None,
            predicate: boxed(predicate),
        }
    }

    fn known<F>(description: String, predicate: F) -> Self
    where
        F: Fn(&Step, Option<&TxnInfo<HttpRequest>>, &Rundown) -> bool + Send + Sync + 'static,
    {
        Self {
            fingerprint: Some(description.clone()),
            description,
            predicate: boxed(predicate),
        }
    }

    pub fn always() -> Self {
        Self::known("always".to_string(), |_, _, _| true)
    }

    pub fn named(step_name: impl Into<String>) -> Self {
        let name = step_name.into();
        Self::known(format!("named({name})"), move |step, _, _| step.name_matches(&name))
    }

    pub fn named_any<I, S>(step_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = step_names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self::known(format!("named_any({})", names.join(", ")), move |step, _, _| {
            names.iter().any(|n| step.name_matches(n))
        })
    }

    pub fn in_folder(folder_path: impl Into<String>) -> Self {
        let path = folder_path.into();
        Self::known(format!("in_folder({path})"), move |step, _, _| step.in_folder(&path))
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::known(format!("tagged({tag})"), move |step, _, _| step.has_tag(&tag))
    }

    pub fn with_header(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::known(format!("with_header({name})"), move |_, request, _| {
            request.is_some_and(|r| r.message().header(&name).is_some())
        })
    }

    pub fn with_header_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        Self::known(format!("with_header({name}={value})"), move |_, request, _| {
            request.is_some_and(|r| r.message().header(&name) == Some(value.as_str()))
        })
    }

    pub fn uri_path_ends_with(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self::known(format!("uri_path_ends_with({suffix})"), move |_, request, _| {
            request
                .and_then(|r| r.message().path())
                .is_some_and(|p| p.ends_with(&suffix))
        })
    }

    pub fn and(self, other: Selector) -> Self {
        let fingerprint = combine(&self, &other, "and");
        let (a, b) = (self.predicate, other.predicate);
        Self {
            description: format!("({} and {})", self.description, other.description),
            fingerprint,
            predicate: boxed(move |s, r, d| a(s, r, d) && b(s, r, d)),
        }
    }

    pub fn or(self, other: Selector) -> Self {
        let fingerprint = combine(&self, &other, "or");
        let (a, b) = (self.predicate, other.predicate);
        Self {
            description: format!("({} or {})", self.description, other.description),
            fingerprint,
            predicate: boxed(move |s, r, d| a(s, r, d) || b(s, r, d)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        let inner = self.predicate;
        Self {
            description: format!("not {}", self.description),
            fingerprint: self.fingerprint.map(|f| format!("not {f}")),
            predicate: boxed(move |s, r, d| !inner(s, r, d)),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn is_always(&self) -> bool {
        self.fingerprint.as_deref() == Some("always")
    }

    /// A panicking predicate counts as no match.
    pub fn matches(&self, step: &Step, request: Option<&TxnInfo<HttpRequest>>, rundown: &Rundown) -> bool {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(step, request, rundown))) {
            Ok(matched) => matched,
            Err(_) => {
                warn!(step = %step, selector = %self.description, "selector panicked; treated as no match");
                false
            }
        }
    }
}

fn boxed<F>(predicate: F) -> Arc<Predicate>
where
    F: Fn(&Step, Option<&TxnInfo<HttpRequest>>, &Rundown) -> bool + Send + Sync + 'static,
{
    Arc::new(predicate)
}

fn combine(a: &Selector, b: &Selector, op: &str) -> Option<String> {
    match (&a.fingerprint, &b.fingerprint) {
        (Some(x), Some(y)) => Some(format!("({x} {op} {y})")),
        _ => None,
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.description).finish()
    }
}

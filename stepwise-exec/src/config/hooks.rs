use std::fmt;
use std::sync::Arc;

use stepwise_core::{ScriptKind, Step};

use crate::http::{HttpRequest, HttpResponse};
use crate::rundown::Rundown;
use crate::script::{ScriptContext, ScriptEvaluator};
use crate::selector::Selector;
use crate::txn::TxnInfo;

/// Any error a hook, validator, or builder may raise.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type PreHookFn =
    dyn Fn(&Step, &TxnInfo<HttpRequest>, &mut Rundown) -> Result<(), HookError> + Send + Sync;
pub type PostHookFn = dyn Fn(&Step, &TxnInfo<HttpRequest>, &TxnInfo<HttpResponse>, &mut Rundown) -> Result<(), HookError>
    + Send
    + Sync;

#[derive(Clone)]
pub enum Hook {
    Pre(Arc<PreHookFn>),
    Post(Arc<PostHookFn>),
}

#[derive(Clone)]
pub struct HookConfig {
    pub selector: Selector,
    pub hook: Hook,
}

impl HookConfig {
    pub fn pre<F>(selector: Selector, hook: F) -> Self
    where
        F: Fn(&Step, &TxnInfo<HttpRequest>, &mut Rundown) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            selector,
            hook: Hook::Pre(Arc::new(hook)),
        }
    }

    pub fn post<F>(selector: Selector, hook: F) -> Self
    where
        F: Fn(&Step, &TxnInfo<HttpRequest>, &TxnInfo<HttpResponse>, &mut Rundown) -> Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            selector,
            hook: Hook::Post(Arc::new(hook)),
        }
    }

    /// Runs the step's pre-request scripts before dispatch.
    pub fn pre_script(selector: Selector, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self::pre(selector, move |step, request, rundown| {
            for script in step.scripts_of(ScriptKind::PreRequest) {
                evaluator.evaluate(
                    script,
                    ScriptContext {
                        step,
                        request,
                        response: None,
                        environment: rundown.environment_mut(),
                    },
                )?;
            }
            Ok(())
        })
    }

    /// Runs the step's test scripts once the response is captured.
    pub fn post_script(selector: Selector, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self::post(selector, move |step, request, response, rundown| {
            for script in step.scripts_of(ScriptKind::Test) {
                evaluator.evaluate(
                    script,
                    ScriptContext {
                        step,
                        request,
                        response: Some(response),
                        environment: rundown.environment_mut(),
                    },
                )?;
            }
            Ok(())
        })
    }

    pub fn is_pre(&self) -> bool {
        matches!(self.hook, Hook::Pre(_))
    }
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = if self.is_pre() { "pre" } else { "post" };
        f.debug_struct("HookConfig")
            .field("phase", &phase)
            .field("selector", &self.selector)
            .finish()
    }
}

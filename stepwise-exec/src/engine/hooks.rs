use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use stepwise_core::Step;
use tracing::debug;

use crate::config::{Hook, HookConfig, HookError};
use crate::http::{HttpRequest, HttpResponse};
use crate::rundown::Rundown;
use crate::txn::TxnInfo;

/// Runs user code, turning both returned errors and panics into a failure message.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T, HookError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Stops at the first failing hook.
pub(crate) fn run_pre_hooks(
    hooks: &[HookConfig],
    step: &Step,
    request: &TxnInfo<HttpRequest>,
    rundown: &mut Rundown,
) -> Result<(), String> {
    for (i, config) in hooks.iter().enumerate() {
        let Hook::Pre(hook) = &config.hook else {
            continue;
        };
        if !config.selector.matches(step, Some(request), rundown) {
            continue;
        }
        debug!(step = %step, hook = i, selector = config.selector.description(), "running pre-step hook");
        guarded(|| hook(step, request, rundown))
            .map_err(|cause| format!("pre-step hook #{i} ({}): {cause}", config.selector.description()))?;
    }
    Ok(())
}

pub(crate) fn run_post_hooks(
    hooks: &[HookConfig],
    step: &Step,
    request: &TxnInfo<HttpRequest>,
    response: &TxnInfo<HttpResponse>,
    rundown: &mut Rundown,
) -> Result<(), String> {
    for (i, config) in hooks.iter().enumerate() {
        let Hook::Post(hook) = &config.hook else {
            continue;
        };
        if !config.selector.matches(step, Some(request), rundown) {
            continue;
        }
        debug!(step = %step, hook = i, selector = config.selector.description(), "running post-step hook");
        guarded(|| hook(step, request, response, rundown))
            .map_err(|cause| format!("post-step hook #{i} ({}): {cause}", config.selector.description()))?;
    }
    Ok(())
}

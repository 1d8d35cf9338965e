use stepwise_core::Step;
use tracing::debug;

use super::hooks::guarded;
use crate::config::{RequestConfig, ResponseConfig, ValidationInput, ValidationVerdict, Validator};
use crate::http::{HttpRequest, HttpResponse};
use crate::marshal::{JsonAdapter, TargetType, TypedValue};
use crate::report::{FailureKind, StepFailure};
use crate::rundown::Rundown;
use crate::txn::{Message, TxnInfo};

/// Applies every matching request config in order; the first failure wins.
pub(crate) fn apply_request_configs(
    configs: &[RequestConfig],
    step: &Step,
    request: &TxnInfo<HttpRequest>,
    rundown: &Rundown,
) -> Result<(), StepFailure> {
    for config in configs {
        if !config.selector.matches(step, Some(request), rundown) {
            continue;
        }
        debug!(step = %step, selector = config.selector.description(), "applying request config");
        apply(
            request,
            config.target.as_ref(),
            &config.adapters,
            config.validator.as_ref(),
            rundown,
            FailureKind::RequestMarshallingFailure,
            FailureKind::RequestValidationFailure,
        )?;
    }
    Ok(())
}

/// Applies every matching response config whose outcome admits the status class.
pub(crate) fn apply_response_configs(
    configs: &[ResponseConfig],
    step: &Step,
    request: &TxnInfo<HttpRequest>,
    response: &TxnInfo<HttpResponse>,
    accepted: bool,
    rundown: &Rundown,
) -> Result<(), StepFailure> {
    for config in configs {
        if !config.outcome.admits(accepted) || !config.selector.matches(step, Some(request), rundown) {
            continue;
        }
        debug!(step = %step, selector = config.selector.description(), outcome = ?config.outcome, "applying response config");
        apply(
            response,
            config.target.as_ref(),
            &config.adapters,
            config.validator.as_ref(),
            rundown,
            FailureKind::ResponseMarshallingFailure,
            FailureKind::ResponseValidationFailure,
        )?;
    }
    Ok(())
}

fn apply<M: Message>(
    txn: &TxnInfo<M>,
    target: Option<&TargetType>,
    adapters: &[JsonAdapter],
    validator: Option<&Validator>,
    rundown: &Rundown,
    marshalling_kind: FailureKind,
    validation_kind: FailureKind,
) -> Result<(), StepFailure> {
    let typed: Option<TypedValue> = match target {
        Some(target) => Some(
            txn.decode_target(target, adapters)
                .map_err(|e| StepFailure::new(marshalling_kind, e.to_string()))?,
        ),
        None => None,
    };

    let Some(validator) = validator else {
        return Ok(());
    };
    let input = ValidationInput {
        typed: typed.as_ref(),
        json: txn.json(),
        environment: rundown.environment(),
    };
    let verdict = guarded(|| Ok(validator.check(&input)))
        .map_err(|cause| StepFailure::new(validation_kind, format!("validator {}: {cause}", validator.description())))?;
    match verdict {
        ValidationVerdict::Success => Ok(()),
        ValidationVerdict::Failure(reason) => Err(StepFailure::new(
            validation_kind,
            format!("{}: {reason}", validator.description()),
        )),
    }
}

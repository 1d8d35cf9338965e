use stepwise_core::{Environment, Script, Step};

use crate::config::HookError;
use crate::http::{HttpRequest, HttpResponse};
use crate::txn::TxnInfo;

pub struct ScriptContext<'a> {
    pub step: &'a Step,
    pub request: &'a TxnInfo<HttpRequest>,
    /// `None` for pre-request scripts.
    pub response: Option<&'a TxnInfo<HttpResponse>>,
    pub environment: &'a mut Environment,
}

/// Runs the raw pre-request and test scripts embedded in a collection.
///
/// No interpreter ships with this crate; plug one in through `HookConfig::pre_script` and
/// `HookConfig::post_script`.
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, script: &Script, ctx: ScriptContext<'_>) -> Result<(), HookError>;
}

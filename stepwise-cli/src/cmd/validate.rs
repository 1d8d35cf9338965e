use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use stepwise_core::template::placeholders;
use stepwise_core::{Auth, DynamicVariables, Step};

use crate::cmd::config::{load_collection, load_environment};
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::{EnvironmentArgs, OutputArgs};

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    steps: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    undefined_variables: Vec<String>,
}

/// Exits non-zero only when the collection or an environment file fails to parse; undefined
/// variables are reported as warnings since hooks may set them during a run.
pub async fn validate_cmd(path: &Path, env: &EnvironmentArgs, output: OutputArgs) -> i32 {
    let parsed = match load_collection(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let environment = match load_environment(env, &parsed.variables, &output) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let dynamic = DynamicVariables::new();
    let undefined: BTreeSet<String> = parsed
        .steps
        .iter()
        .flat_map(referenced_names)
        .filter(|name| !environment.contains_key(name) && !dynamic.is_dynamic(name))
        .collect();

    let result = ValidateResult {
        valid: true,
        format: format!("{:?}", parsed.format),
        steps: parsed.steps.len(),
        undefined_variables: undefined.into_iter().collect(),
    };
    if output.format == OutputFormat::Text && !output.quiet {
        println!("ok: {} steps ({:?})", result.steps, parsed.format);
        for name in &result.undefined_variables {
            eprintln!("warning: '{{{{{name}}}}}' is not defined by the collection or environment");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}

fn referenced_names(step: &Step) -> Vec<String> {
    let request = &step.request;
    let mut names = placeholders(&request.url);
    for (k, v) in &request.headers {
        names.extend(placeholders(k));
        names.extend(placeholders(v));
    }
    if let Some(body) = &request.body {
        names.extend(placeholders(body));
    }
    if let Some(Auth::Bearer { token }) = &request.auth {
        names.extend(placeholders(token));
    }
    names
}

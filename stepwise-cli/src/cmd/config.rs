use std::path::Path;

use stepwise_core::{
    merge_environments, parse_collection_str, parse_environment_str, DocumentFormat, Environment,
    ParsedCollection,
};
use stepwise_exec::{FailureKind, HaltPolicy, Selector, StepFilter, IGNORE_FAILURE_TAG};

use crate::exit_codes;
use crate::output::print_error;
use crate::{EnvironmentArgs, FilterArgs, HaltArgs, OutputArgs};

pub fn read_file(path: &Path, output: &OutputArgs) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })
}

pub fn load_collection(path: &Path, output: &OutputArgs) -> Result<ParsedCollection, i32> {
    let content = read_file(path, output)?;
    parse_collection_str(&content, DocumentFormat::Auto).map_err(|e| {
        print_error(output.format, output.quiet, &format!("invalid collection: {e}"));
        exit_codes::VALIDATION_FAILED
    })
}

/// Collection variables, then each `--env` file in order, then `--set` overrides.
pub fn load_environment(
    args: &EnvironmentArgs,
    collection_vars: &Environment,
    output: &OutputArgs,
) -> Result<Environment, i32> {
    let mut layers = vec![collection_vars.clone()];
    for path in &args.env_files {
        let content = read_file(path, output)?;
        let env = parse_environment_str(&content, DocumentFormat::Auto).map_err(|e| {
            print_error(
                output.format,
                output.quiet,
                &format!("invalid environment {}: {e}", path.display()),
            );
            exit_codes::VALIDATION_FAILED
        })?;
        layers.push(env);
    }
    let overrides = parse_set_vars(&args.set_vars).map_err(|e| {
        print_error(output.format, output.quiet, &e);
        exit_codes::VALIDATION_FAILED
    })?;
    Ok(merge_environments(layers, &overrides))
}

pub fn parse_set_vars(set_vars: &[String]) -> Result<Environment, String> {
    let mut env = Environment::new();
    for s in set_vars {
        match s.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                env.set(k.trim(), v);
            }
            _ => return Err(format!("expected KEY=VALUE, got '{s}'")),
        }
    }
    Ok(env)
}

/// Steps tagged `ignore-failure` in the collection are always exempt, on top of `--except`.
pub fn build_halt_policy(args: &HaltArgs) -> Result<HaltPolicy, String> {
    let policy = match args.halt_on.trim() {
        "any" => HaltPolicy::default(),
        "never" => HaltPolicy::never(),
        kinds => {
            let parsed = kinds
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| FailureKind::parse(k).ok_or_else(|| format!("unknown failure kind '{k}'")))
                .collect::<Result<Vec<_>, _>>()?;
            if parsed.is_empty() {
                return Err("--halt-on needs 'any', 'never' or at least one failure kind".to_string());
            }
            HaltPolicy::on_kinds(parsed)
        }
    };
    let policy = policy.except(Selector::tagged(IGNORE_FAILURE_TAG));
    if args.except.is_empty() {
        return Ok(policy);
    }
    Ok(policy.except(Selector::named_any(args.except.iter().cloned())))
}

pub fn build_step_filter(args: &FilterArgs) -> StepFilter {
    StepFilter {
        run_only: args.run_only.iter().cloned().collect(),
        skip: args.skip.iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_vars_require_key_and_equals() {
        let env = parse_set_vars(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(env.get_str("a"), Some("1"));
        assert_eq!(env.get_str("b"), Some("x=y"));
        assert!(parse_set_vars(&["nope".to_string()]).is_err());
        assert!(parse_set_vars(&["=v".to_string()]).is_err());
    }

    #[test]
    fn halt_on_accepts_kind_lists() {
        let args = HaltArgs {
            halt_on: "http-status-failure, transport-failure".to_string(),
            except: vec![],
        };
        let policy = build_halt_policy(&args).unwrap();
        assert!(policy.halt_on.covers(FailureKind::TransportFailure));
        assert!(!policy.halt_on.covers(FailureKind::PollTimedOut));

        let args = HaltArgs {
            halt_on: "sometimes".to_string(),
            except: vec![],
        };
        assert!(build_halt_policy(&args).is_err());
    }

    #[test]
    fn ignore_failure_tag_is_always_exempt() {
        use stepwise_core::{Environment, RequestTemplate, Step};
        use stepwise_exec::Rundown;

        let args = HaltArgs {
            halt_on: "any".to_string(),
            except: vec![],
        };
        let policy = build_halt_policy(&args).unwrap();
        let rundown = Rundown::new(Environment::new());
        let tagged = Step::new("1", "flaky", RequestTemplate::new("GET", "http://x/flaky"))
            .with_tag(IGNORE_FAILURE_TAG);
        let plain = Step::new("2", "solid", RequestTemplate::new("GET", "http://x/solid"));
        assert!(policy.is_exempt(&tagged, None, &rundown));
        assert!(!policy.is_exempt(&plain, None, &rundown));
    }
}

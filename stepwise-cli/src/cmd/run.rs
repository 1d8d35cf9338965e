use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use stepwise_exec::{
    Engine, EventSink, HttpClient, LoggingConfig, NoOpEventSink, ReqwestHttpClient, RunConfig,
    RunSummary, StdoutEventSink, TracingEventSink,
};

use crate::cmd::config::{build_halt_policy, build_step_filter, load_collection, load_environment};
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{EnvironmentArgs, FilterArgs, HaltArgs, HttpArgs, OutputArgs};

pub async fn run_cmd(
    path: &Path,
    env: &EnvironmentArgs,
    halt: &HaltArgs,
    filter: &FilterArgs,
    http: &HttpArgs,
    events: &str,
    output: OutputArgs,
) -> i32 {
    let parsed = match load_collection(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let environment = match load_environment(env, &parsed.variables, &output) {
        Ok(e) => e,
        Err(code) => return code,
    };
    let halt_policy = match build_halt_policy(halt) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::VALIDATION_FAILED;
        }
    };
    let event_sink: Arc<dyn EventSink> = match events {
        "log" => Arc::new(TracingEventSink),
        "stdout" => Arc::new(StdoutEventSink),
        "none" => Arc::new(NoOpEventSink),
        other => {
            print_error(
                output.format,
                output.quiet,
                &format!("unknown events sink '{other}' (expected log, stdout or none)"),
            );
            return exit_codes::VALIDATION_FAILED;
        }
    };
    let client: Arc<dyn HttpClient> = if http.insecure {
        Arc::new(ReqwestHttpClient::insecure())
    } else {
        Arc::new(ReqwestHttpClient::default())
    };

    let config = RunConfig::default()
        .with_environment(environment)
        .with_halt_policy(halt_policy)
        .with_step_filter(build_step_filter(filter))
        .with_accepted_status((!http.any_status).then_some(200..=299))
        .with_http_timeout(Duration::from_millis(http.timeout))
        .with_logging(LoggingConfig {
            log_bodies: http.log_bodies,
            ..LoggingConfig::default()
        });

    let engine = Engine::new(client).with_event_sink(event_sink);
    let rundown = match engine.run(&parsed.steps, config).await {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("invalid run configuration: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let summary = rundown.summary();
    if output.format == OutputFormat::Text && !output.quiet {
        print_text_summary(&summary);
    } else {
        print_result(output.format, output.quiet, &summary);
    }

    if rundown.are_all_steps_except_ignored_successful() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_FAILED
    }
}

fn print_text_summary(summary: &RunSummary) {
    for step in &summary.steps {
        let mark = match (&step.failure, step.ignored_for_failure) {
            (None, _) => "ok",
            (Some(_), true) => "ignored",
            (Some(_), false) => "FAILED",
        };
        let status = step
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  [{mark}] {} {} {} ({status})", step.index, step.method, step.name);
        if let (Some(kind), Some(cause)) = (&step.failure, &step.cause) {
            println!("        {kind}: {cause}");
        }
    }
    println!(
        "{}: {} executed, {} succeeded, {} failed ({} ignored)",
        summary.status.as_str(),
        summary.executed,
        summary.succeeded,
        summary.failed,
        summary.ignored
    );
}

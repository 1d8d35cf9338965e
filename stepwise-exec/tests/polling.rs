use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use stepwise_core::{DynamicVariables, Environment, RequestTemplate, Step};
use stepwise_exec::{
    ConfigError, Engine, FailureKind, HaltPolicy, HookConfig, HttpClient, HttpError, HttpRequest,
    HttpResponse, PollOutcome, PollingConfig, RunConfig, Selector,
};
use tokio::time::Instant;

// The job is "done" from the `done_after`-th poll on.
struct JobServer {
    start_status: u16,
    done_after: usize,
    polls: Mutex<Vec<Instant>>,
    poll_urls: Mutex<Vec<String>>,
}

impl JobServer {
    fn new(done_after: usize) -> Arc<Self> {
        Arc::new(Self {
            start_status: 202,
            done_after,
            polls: Mutex::new(Vec::new()),
            poll_urls: Mutex::new(Vec::new()),
        })
    }

    fn poll_offsets(&self) -> Vec<Duration> {
        let polls = self.polls.lock().unwrap();
        polls.iter().map(|t| t.duration_since(polls[0])).collect()
    }

    fn poll_urls(&self) -> Vec<String> {
        self.poll_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for JobServer {
    async fn send(&self, req: HttpRequest, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        if req.url.ends_with("/jobs") {
            return Ok(HttpResponse::json(self.start_status, &json!({"jobId": "j1"})));
        }
        self.poll_urls.lock().unwrap().push(req.url.clone());
        let mut polls = self.polls.lock().unwrap();
        polls.push(Instant::now());
        let state = if polls.len() >= self.done_after { "done" } else { "pending" };
        Ok(HttpResponse::json(200, &json!({"state": state})))
    }
}

fn start_job() -> Vec<Step> {
    vec![Step::new("1", "start job", RequestTemplate::new("POST", "https://api.test/jobs"))]
}

fn env() -> Environment {
    let mut env = Environment::new();
    env.set("jobId", "j1");
    env
}

fn poll_until_done(interval: u64, timeout: u64) -> PollingConfig {
    PollingConfig::from_template(
        Selector::named("start job"),
        RequestTemplate::new("GET", "https://api.test/jobs/{{jobId}}"),
        |response, _env| Ok(response.json().is_some_and(|j| j["state"] == "done")),
    )
    .interval(Duration::from_secs(interval))
    .timeout(Duration::from_secs(timeout))
}

#[tokio::test(start_paused = true)]
async fn satisfied_on_third_poll() {
    let server = JobServer::new(3);
    let config = RunConfig::default()
        .with_environment(env())
        .with_polling(poll_until_done(2, 30));

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert!(report.is_successful());
    let polling = report.polling.as_ref().unwrap();
    assert_eq!(polling.attempts, 3);
    assert_eq!(polling.outcome, PollOutcome::Satisfied);
    assert_eq!(polling.responses.len(), 3);
    assert_eq!(
        server.poll_offsets(),
        vec![Duration::ZERO, Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test(start_paused = true)]
async fn never_satisfied_times_out_after_three_polls() {
    let server = JobServer::new(usize::MAX);
    let config = RunConfig::default()
        .with_environment(env())
        .with_polling(poll_until_done(2, 5));

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert_eq!(report.failure_kind(), Some(FailureKind::PollTimedOut));
    let polling = report.polling.as_ref().unwrap();
    assert_eq!(polling.attempts, 3);
    assert_eq!(polling.outcome, PollOutcome::TimedOut);
    assert!(polling.total_duration >= Duration::from_secs(5));
    assert_eq!(
        server.poll_offsets(),
        vec![Duration::ZERO, Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_steps_are_not_polled() {
    let server = Arc::new(JobServer {
        start_status: 500,
        done_after: 1,
        polls: Mutex::new(Vec::new()),
        poll_urls: Mutex::new(Vec::new()),
    });
    let config = RunConfig::default()
        .with_environment(env())
        .with_polling(poll_until_done(2, 30));

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert_eq!(report.failure_kind(), Some(FailureKind::HttpStatusFailure));
    assert!(report.polling.is_none());
    assert!(server.poll_offsets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_exchanges_skip_hooks() {
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = hook_calls.clone();
    let config = RunConfig::default()
        .with_environment(env())
        .with_hook(HookConfig::post(Selector::always(), move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .with_polling(poll_until_done(1, 10));

    let rundown = Engine::new(JobServer::new(2)).run(&start_job(), config).await.unwrap();

    assert!(rundown.are_all_steps_successful());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_predicate_keeps_polling_until_timeout() {
    let server = JobServer::new(1);
    let polling = PollingConfig::from_template(
        Selector::always(),
        RequestTemplate::new("GET", "https://api.test/jobs/{{jobId}}"),
        |_, _| Err("cannot read job state".into()),
    )
    .interval(Duration::from_secs(2))
    .timeout(Duration::from_secs(5));
    let config = RunConfig::default()
        .with_halt_policy(HaltPolicy::never())
        .with_environment(env())
        .with_polling(polling);

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert_eq!(report.failure_kind(), Some(FailureKind::PollTimedOut));
    let polling = report.polling.as_ref().unwrap();
    assert_eq!(polling.outcome, PollOutcome::TimedOut);
    assert_eq!(polling.attempts, 3);
    assert_eq!(server.poll_offsets().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn panicking_predicate_is_not_satisfied_yet() {
    let server = JobServer::new(2);
    let polling = PollingConfig::from_template(
        Selector::always(),
        RequestTemplate::new("GET", "https://api.test/jobs/{{jobId}}"),
        |response, _| {
            let state = response.json().and_then(|j| j["state"].as_str()).unwrap_or_default();
            if state == "pending" {
                panic!("job still pending");
            }
            Ok(state == "done")
        },
    )
    .interval(Duration::from_secs(1))
    .timeout(Duration::from_secs(10));
    let config = RunConfig::default().with_environment(env()).with_polling(polling);

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert!(report.is_successful());
    assert_eq!(report.polling.as_ref().unwrap().attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn poll_requests_use_the_run_dynamic_variables() {
    let server = JobServer::new(1);
    let polling = PollingConfig::from_template(
        Selector::always(),
        RequestTemplate::new("GET", "https://api.test/jobs/{{jobId}}?trace={{traceId}}"),
        |response, _| Ok(response.json().is_some_and(|j| j["state"] == "done")),
    );
    let config = RunConfig::default()
        .with_environment(env())
        .with_dynamic_variables(DynamicVariables::new().with("traceId", |_, _| "t-123".to_string()))
        .with_polling(polling);

    let rundown = Engine::new(server.clone()).run(&start_job(), config).await.unwrap();

    assert!(rundown.are_all_steps_successful());
    assert_eq!(server.poll_offsets().len(), 1);
    assert_eq!(
        server.poll_urls(),
        vec!["https://api.test/jobs/j1?trace=t-123".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn unresolvable_poll_template_is_a_request_failure() {
    let config = RunConfig::default().with_polling(poll_until_done(2, 30));

    let rundown = Engine::new(JobServer::new(1)).run(&start_job(), config).await.unwrap();

    let report = &rundown.step_reports()[0];
    assert_eq!(report.failure_kind(), Some(FailureKind::PollRequestFailure));
    assert!(report.failure.as_ref().unwrap().cause.contains("jobId"));
}

#[tokio::test]
async fn interval_longer_than_timeout_is_rejected() {
    let config = RunConfig::default().with_polling(poll_until_done(10, 5));

    let err = Engine::new(JobServer::new(1)).run(&start_job(), config).await.unwrap_err();

    match err {
        ConfigError::InvalidPolling { reason, .. } => assert_eq!(reason, "interval exceeds timeout"),
        _ => panic!("expected InvalidPolling"),
    }
}

use std::collections::BTreeSet;

use stepwise_core::{Environment, FolderPath, RequestTemplate, Step};
use stepwise_exec::{
    FailureKind, HaltOn, HaltPolicy, HttpRequest, Rundown, Selector, StepFailure, StepReport, TxnInfo,
};

fn step() -> Step {
    Step::new("2.1", "create order", RequestTemplate::new("POST", "https://api.test/v1/orders"))
        .with_folder(FolderPath::new(["checkout", "happy path"]))
        .with_tag("smoke")
}

fn request() -> TxnInfo<HttpRequest> {
    TxnInfo::from(HttpRequest::new("POST", "https://api.test/v1/orders?dry=1").with_header("X-Tenant", "acme"))
}

fn rundown() -> Rundown {
    Rundown::new(Environment::new())
}

#[test]
fn builtin_selectors_match_step_metadata() {
    let (step, req, rundown) = (step(), request(), rundown());
    let matches = |s: Selector| s.matches(&step, Some(&req), &rundown);

    assert!(matches(Selector::always()));
    assert!(matches(Selector::named("create order")));
    assert!(matches(Selector::named("happy path<|||create order")));
    assert!(!matches(Selector::named("delete order")));
    assert!(matches(Selector::named_any(["delete order", "create order"])));
    assert!(matches(Selector::in_folder("checkout")));
    assert!(matches(Selector::in_folder("checkout|>happy path")));
    assert!(!matches(Selector::in_folder("refunds")));
    assert!(matches(Selector::tagged("smoke")));
    assert!(!matches(Selector::tagged("slow")));
    assert!(matches(Selector::with_header("x-tenant")));
    assert!(matches(Selector::with_header_value("X-Tenant", "acme")));
    assert!(!matches(Selector::with_header_value("X-Tenant", "other")));
    assert!(matches(Selector::uri_path_ends_with("/orders")));
}

#[test]
fn request_based_selectors_need_a_request() {
    let (step, rundown) = (step(), rundown());
    assert!(!Selector::with_header("X-Tenant").matches(&step, None, &rundown));
    assert!(!Selector::uri_path_ends_with("/orders").matches(&step, None, &rundown));
    assert!(Selector::named("create order").matches(&step, None, &rundown));
}

#[test]
fn combinators_compose() {
    let (step, req, rundown) = (step(), request(), rundown());
    let matches = |s: Selector| s.matches(&step, Some(&req), &rundown);

    assert!(matches(Selector::tagged("smoke").and(Selector::in_folder("checkout"))));
    assert!(!matches(Selector::tagged("smoke").and(Selector::tagged("slow"))));
    assert!(matches(Selector::tagged("slow").or(Selector::named("create order"))));
    assert!(matches(Selector::tagged("slow").not()));
}

#[test]
fn fingerprints_identify_equivalent_selectors() {
    assert_eq!(
        Selector::named("a").and(Selector::tagged("t")).fingerprint(),
        Selector::named("a").and(Selector::tagged("t")).fingerprint()
    );
    assert_eq!(
        Selector::named_any(["b", "a"]).fingerprint(),
        Selector::named_any(["a", "b"]).fingerprint()
    );
    assert!(Selector::custom("anything", |_, _, _| true).fingerprint().is_none());
    assert!(Selector::custom("x", |_, _, _| true).and(Selector::always()).fingerprint().is_none());
    assert!(Selector::always().is_always());
}

#[test]
fn panicking_selector_does_not_match() {
    let selector = Selector::custom("explodes", |_, _, _| panic!("selector bug"));
    assert!(!selector.matches(&step(), None, &rundown()));
}

fn failed_report(kind: FailureKind, ignored: bool) -> StepReport {
    StepReport {
        step: step(),
        request: None,
        response: None,
        failure: Some(StepFailure::new(kind, "boom")),
        polling: None,
        ignored_for_failure: ignored,
        env_snapshot: Environment::new(),
    }
}

#[test]
fn halt_policy_respects_granularity_and_exemptions() {
    let any = HaltPolicy::default();
    assert!(any.should_halt(&failed_report(FailureKind::HttpStatusFailure, false)));
    assert!(!any.should_halt(&failed_report(FailureKind::HttpStatusFailure, true)));

    let never = HaltPolicy::never();
    assert!(!never.should_halt(&failed_report(FailureKind::TransportFailure, false)));

    let status_only = HaltPolicy::on_kinds([FailureKind::HttpStatusFailure]);
    assert_eq!(
        status_only.halt_on,
        HaltOn::FailureKinds(BTreeSet::from([FailureKind::HttpStatusFailure]))
    );
    assert!(status_only.should_halt(&failed_report(FailureKind::HttpStatusFailure, false)));
    assert!(!status_only.should_halt(&failed_report(FailureKind::ResponseValidationFailure, false)));

    let mut ok = failed_report(FailureKind::PollTimedOut, false);
    ok.failure = None;
    assert!(!any.should_halt(&ok));
}

#[test]
fn exemption_is_decided_by_selectors() {
    let policy = HaltPolicy::default().except(Selector::in_folder("checkout"));
    assert!(policy.is_exempt(&step(), None, &rundown()));
    assert!(!HaltPolicy::default().is_exempt(&step(), None, &rundown()));
}

#[test]
fn failure_kinds_round_trip_through_names() {
    for kind in FailureKind::ALL {
        assert_eq!(FailureKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(FailureKind::parse("poll-timed-out"), Some(FailureKind::PollTimedOut));
    assert_eq!(FailureKind::parse("nope"), None);
}

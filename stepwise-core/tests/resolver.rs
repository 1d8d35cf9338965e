use serde_json::json;
use stepwise_core::{
    DynamicVariables, Environment, RequestTemplate, TemplateError, VariableResolver,
};

fn env(pairs: &[(&str, serde_json::Value)]) -> Environment {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn substitutes_url_headers_and_body() {
    let mut env = env(&[
        ("baseUrl", json!("https://api.test")),
        ("orderId", json!(42)),
        ("trace", json!("abc")),
    ]);
    let template = RequestTemplate::new("get", "{{baseUrl}}/orders/{{orderId}}")
        .with_header("X-Trace", "{{trace}}")
        .with_body(r#"{"id": {{orderId}}}"#);

    let resolved = VariableResolver::default().resolve_request(&template, &mut env).unwrap();
    assert_eq!(resolved.method, "GET");
    assert_eq!(resolved.url, "https://api.test/orders/42");
    assert_eq!(resolved.header("x-trace"), Some("abc"));
    assert_eq!(resolved.body.as_deref(), Some(r#"{"id": 42}"#));
    assert_eq!(resolved.header("content-type"), Some("application/json"));
}

#[test]
fn nested_placeholders_resolve_across_passes() {
    let mut env = env(&[
        ("host", json!("{{scheme}}://{{domain}}")),
        ("scheme", json!("https")),
        ("domain", json!("api.test")),
    ]);
    let template = RequestTemplate::new("GET", "{{host}}/ping");
    let resolved = VariableResolver::default().resolve_request(&template, &mut env).unwrap();
    assert_eq!(resolved.url, "https://api.test/ping");
}

#[test]
fn missing_variable_is_named() {
    let mut env = env(&[("baseUrl", json!("https://api.test"))]);
    let template = RequestTemplate::new("GET", "{{baseUrl}}/orders/{{orderId}}");
    let err = VariableResolver::default()
        .resolve_request(&template, &mut env)
        .unwrap_err();
    assert_eq!(err, TemplateError::UnresolvedVariable { name: "orderId".to_string() });
}

#[test]
fn self_referencing_variable_does_not_loop_forever() {
    let mut env = env(&[("a", json!("{{a}}"))]);
    let err = VariableResolver::default().resolve_str("{{a}}", &mut env).unwrap_err();
    assert_eq!(err, TemplateError::UnresolvedVariable { name: "a".to_string() });
}

#[test]
fn resolving_a_resolved_request_is_a_no_op() {
    let mut env = env(&[("baseUrl", json!("https://api.test")), ("token", json!("t0k"))]);
    let template = RequestTemplate::new("POST", " {{baseUrl}}/orders ")
        .with_body(r#"{"qty": 1}"#)
        .with_bearer("{{token}}");
    let resolver = VariableResolver::default();

    let first = resolver.resolve_request(&template, &mut env).unwrap();
    let env_after_first = env.clone();
    let second = resolver
        .resolve_request(&first.clone().into_template(), &mut env)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(env, env_after_first);
    assert_eq!(first.header("authorization"), Some("Bearer t0k"));
}

#[test]
fn bearer_auth_replaces_existing_authorization_header() {
    let mut env = Environment::new();
    let template = RequestTemplate::new("GET", "https://api.test")
        .with_header("Authorization", "Basic xyz")
        .with_bearer("abc");
    let resolved = VariableResolver::default().resolve_request(&template, &mut env).unwrap();
    let auth: Vec<_> = resolved
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
        .collect();
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0].1, "Bearer abc");
}

#[test]
fn dynamic_variable_is_generated_once_per_step_and_stored() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls = counter.clone();
    let dynamic = DynamicVariables::new().with("$orderRef", move |_, _| {
        let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("ref-{n}")
    });
    let resolver = VariableResolver::new(dynamic);
    let mut env = Environment::new();
    let template = RequestTemplate::new("POST", "https://api.test/{{$orderRef}}")
        .with_body(r#"{"ref": "{{$orderRef}}"}"#);

    let resolved = resolver.resolve_request(&template, &mut env).unwrap();
    assert_eq!(resolved.url, "https://api.test/ref-0");
    assert_eq!(resolved.body.as_deref(), Some(r#"{"ref": "ref-0"}"#));
    assert_eq!(env.get_str("$orderRef"), Some("ref-0"));

    let again = resolver.resolve_request(&template, &mut env).unwrap();
    assert_eq!(again.url, "https://api.test/ref-1");
}

#[test]
fn builtin_uuid_is_shared_within_one_request() {
    let mut env = Environment::new();
    let template = RequestTemplate::new("POST", "https://api.test/{{$randomUUID}}")
        .with_header("X-Id", "{{$randomUUID}}");
    let resolved = VariableResolver::default().resolve_request(&template, &mut env).unwrap();
    let id = resolved.header("x-id").unwrap();
    assert_eq!(id.len(), 36);
    assert!(resolved.url.ends_with(id));
}

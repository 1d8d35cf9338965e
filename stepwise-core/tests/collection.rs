use stepwise_core::{
    merge_environments, parse_collection_str, parse_environment_str, Auth, CollectionError,
    DocumentFormat, Environment, ScriptKind,
};

const COLLECTION: &str = r#"
{
  "info": { "name": "orders" },
  "auth": { "type": "bearer", "bearer": [{ "key": "token", "value": "{{rootToken}}", "type": "string" }] },
  "variable": [{ "key": "baseUrl", "value": "https://api.test" }],
  "item": [
    {
      "name": "login",
      "request": { "method": "post", "url": { "raw": " {{baseUrl}}/login " }, "auth": { "type": "noauth" } }
    },
    {
      "name": "orders",
      "auth": { "type": "bearer", "bearer": [{ "key": "token", "value": "{{orderToken}}" }] },
      "item": [
        {
          "name": "create order",
          "event": [
            { "listen": "prerequest", "script": { "exec": ["pm.environment.set('a', 1);"] } },
            { "listen": "test", "script": { "exec": "pm.test('ok');" } }
          ],
          "request": {
            "method": "POST",
            "header": [
              { "key": "x-stepwise-tags", "value": "smoke, ignore-failure" },
              { "key": "X-Trace", "value": "t", "disabled": true }
            ],
            "url": "{{baseUrl}}/orders",
            "body": { "mode": "raw", "raw": "{\"qty\": 1}" }
          }
        },
        {
          "name": "nested",
          "item": [
            { "name": "get order", "request": "{{baseUrl}}/orders/{{orderId}}" }
          ]
        }
      ]
    }
  ]
}
"#;

#[test]
fn flattens_items_depth_first_with_hierarchical_indices() {
    let parsed = parse_collection_str(COLLECTION, DocumentFormat::Auto).unwrap();
    assert_eq!(parsed.format, DocumentFormat::Json);
    assert_eq!(parsed.name.as_deref(), Some("orders"));

    let indices: Vec<_> = parsed.steps.iter().map(|s| s.index.as_str()).collect();
    assert_eq!(indices, vec!["1", "2.1", "2.2.1"]);

    let get = &parsed.steps[2];
    assert_eq!(get.folder.segments(), &["orders".to_string(), "nested".to_string()]);
    assert_eq!(get.method(), "GET");
    assert_eq!(get.display_name(), "2.2.1 ### GET ~~> orders|>nested<|||get order|||>");
}

#[test]
fn auth_is_inherited_from_nearest_ancestor() {
    let parsed = parse_collection_str(COLLECTION, DocumentFormat::Json).unwrap();
    assert_eq!(parsed.steps[0].request.auth, None);
    assert_eq!(
        parsed.steps[1].request.auth,
        Some(Auth::Bearer { token: "{{orderToken}}".to_string() })
    );
    assert_eq!(
        parsed.steps[2].request.auth,
        Some(Auth::Bearer { token: "{{orderToken}}".to_string() })
    );
}

#[test]
fn tag_header_becomes_tags_and_disabled_headers_are_dropped() {
    let parsed = parse_collection_str(COLLECTION, DocumentFormat::Json).unwrap();
    let create = &parsed.steps[1];
    assert!(create.has_tag("smoke"));
    assert!(create.has_tag("ignore-failure"));
    assert!(create.request.headers.is_empty());
    assert_eq!(create.request.body.as_deref(), Some("{\"qty\": 1}"));
    assert_eq!(create.scripts_of(ScriptKind::PreRequest).count(), 1);
    assert_eq!(create.scripts_of(ScriptKind::Test).count(), 1);
}

#[test]
fn collection_variables_are_exposed() {
    let parsed = parse_collection_str(COLLECTION, DocumentFormat::Json).unwrap();
    assert_eq!(parsed.variables.get_str("baseUrl"), Some("https://api.test"));
    assert_eq!(parsed.steps[0].request.url, "{{baseUrl}}/login");
}

#[test]
fn yaml_collections_are_detected() {
    let yaml = r#"
info:
  name: tiny
item:
  - name: ping
    request:
      method: GET
      url: https://api.test/ping
"#;
    let parsed = parse_collection_str(yaml, DocumentFormat::Auto).unwrap();
    assert_eq!(parsed.format, DocumentFormat::Yaml);
    assert_eq!(parsed.steps.len(), 1);
    assert_eq!(parsed.steps[0].request.url, "https://api.test/ping");
}

#[test]
fn empty_collection_is_rejected() {
    let result = parse_collection_str(r#"{ "item": [] }"#, DocumentFormat::Json);
    match result {
        Err(CollectionError::Empty) => {}
        other => panic!("expected Empty, got {other:?}"),
    }
}

#[test]
fn request_without_url_is_rejected() {
    let result = parse_collection_str(
        r#"{ "item": [ { "name": "broken", "request": { "method": "GET" } } ] }"#,
        DocumentFormat::Json,
    );
    match result {
        Err(CollectionError::MissingUrl { index }) => assert_eq!(index, "1"),
        other => panic!("expected MissingUrl, got {other:?}"),
    }
}

#[test]
fn environment_keeps_only_enabled_values_and_overrides_win() {
    let file_a = parse_environment_str(
        r#"{ "name": "a", "values": [
            { "key": "host", "value": "a.test", "enabled": true },
            { "key": "secret", "value": "x", "enabled": false }
        ] }"#,
        DocumentFormat::Auto,
    )
    .unwrap();
    let file_b = parse_environment_str(
        r#"{ "values": [ { "key": "host", "value": "b.test", "enabled": true } ] }"#,
        DocumentFormat::Auto,
    )
    .unwrap();
    assert!(!file_a.contains_key("secret"));

    let mut overrides = Environment::new();
    overrides.set("user", "admin");
    let merged = merge_environments([file_a, file_b], &overrides);
    assert_eq!(merged.get_str("host"), Some("b.test"));
    assert_eq!(merged.get_str("user"), Some("admin"));
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Insertion-ordered run variables.
///
/// Keys are only ever added or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    vars: IndexMap<String, JsonValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.vars.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(JsonValue::as_str)
    }

    /// Integers stored either as JSON numbers or as numeric strings.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.vars.get(key)? {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text used when substituting `{{key}}`; non-strings become compact JSON.
    pub fn get_as_text(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(value_to_text)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys_starting_with(&self, prefix: &str) -> Environment {
        self.filtered(|k| k.starts_with(prefix))
    }

    pub fn keys_ending_with(&self, suffix: &str) -> Environment {
        self.filtered(|k| k.ends_with(suffix))
    }

    /// Postman environment export, every value enabled.
    pub fn to_postman_json(&self, name: &str) -> JsonValue {
        let values = self
            .vars
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": value_to_text(v), "enabled": true }))
            .collect::<Vec<_>>();
        json!({ "name": name, "values": values })
    }

    fn filtered(&self, keep: impl Fn(&str) -> bool) -> Environment {
        self.vars
            .iter()
            .filter(|(k, _)| keep(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Extend<(String, JsonValue)> for Environment {
    fn extend<T: IntoIterator<Item = (String, JsonValue)>>(&mut self, iter: T) {
        self.vars.extend(iter);
    }
}

impl FromIterator<(String, JsonValue)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, JsonValue)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl From<JsonValue> for Environment {
    /// A flat JSON object; any other shape yields an empty environment.
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => map.into_iter().collect(),
            _ => Environment::new(),
        }
    }
}

fn value_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_original_position() {
        let mut env = Environment::new();
        env.set("a", "1");
        env.set("b", "2");
        env.set("a", "3");
        assert_eq!(env.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(env.get_str("a"), Some("3"));
    }

    #[test]
    fn non_string_values_render_as_json_text() {
        let mut env = Environment::new();
        env.set("n", 42);
        env.set("obj", json!({ "id": 7 }));
        assert_eq!(env.get_as_text("n").as_deref(), Some("42"));
        assert_eq!(env.get_as_text("obj").as_deref(), Some(r#"{"id":7}"#));
        assert_eq!(env.get_i64("n"), Some(42));
    }

    #[test]
    fn prefix_filter_returns_copy() {
        let mut env = Environment::new();
        env.set("orderId", "1");
        env.set("orderStatus", "open");
        env.set("userId", "u");
        let orders = env.keys_starting_with("order");
        assert_eq!(orders.len(), 2);
        assert_eq!(env.len(), 3);
    }
}

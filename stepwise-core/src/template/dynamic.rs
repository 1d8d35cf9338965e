use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, TimeDelta, Utc};

use crate::environment::Environment;

/// Produces a fresh value for a variable name; receives the current environment.
pub type DynamicGenerator = Arc<dyn Fn(&str, &Environment) -> String + Send + Sync>;

/// Registry of generated variables; custom generators shadow the built-in `$random*` family.
#[derive(Clone, Default)]
pub struct DynamicVariables {
    custom: BTreeMap<String, DynamicGenerator>,
}

impl DynamicVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&str, &Environment) -> String + Send + Sync + 'static,
    {
        self.insert(name, generator);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: Fn(&str, &Environment) -> String + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(generator));
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        self.custom.contains_key(name) || BUILTIN_NAMES.contains(&name)
    }

    pub fn generate(&self, name: &str, env: &Environment) -> Option<String> {
        if let Some(generator) = self.custom.get(name) {
            return Some(generator(name, env));
        }
        builtin(name)
    }
}

impl fmt::Debug for DynamicVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicVariables")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub const BUILTIN_NAMES: &[&str] = &[
    "$randomUUID",
    "$randomInt",
    "$randomFirstName",
    "$randomLastName",
    "$randomUserName",
    "$randomEmail",
    "$randomCity",
    "$randomCompanyName",
    "$randomColor",
    "$randomWord",
    "$randomAdjective",
    "$currentDate",
    "$randomFutureDate",
    "$timestamp",
    "$epoch",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Torvalds", "Hamilton", "Ritchie", "Liskov", "Thompson", "Allen",
    "Dijkstra",
];
const CITIES: &[&str] = &[
    "Lisbon", "Osaka", "Nairobi", "Montreal", "Tallinn", "Valparaiso", "Hyderabad", "Auckland",
];
const WORDS: &[&str] = &[
    "harbor", "lantern", "meadow", "circuit", "orbit", "granite", "willow", "signal", "ember",
];
const COMPANIES: &[&str] = &[
    "Acme Corp", "Globex", "Initech", "Umbrella Labs", "Stark Industries", "Hooli", "Vandelay Imports",
];
const COLORS: &[&str] = &[
    "red", "orange", "yellow", "green", "blue", "indigo", "violet", "teal", "magenta",
];
const ADJECTIVES: &[&str] = &[
    "brave", "calm", "eager", "gentle", "lively", "proud", "witty", "zealous", "bright",
];

fn pick(list: &[&str]) -> String {
    list[fastrand::usize(..list.len())].to_string()
}

fn builtin(name: &str) -> Option<String> {
    let value = match name {
        "$randomUUID" => uuid::Uuid::new_v4().to_string(),
        "$randomInt" => fastrand::i32(0..i32::MAX).to_string(),
        "$randomFirstName" => pick(FIRST_NAMES),
        "$randomLastName" => pick(LAST_NAMES),
        "$randomUserName" => format!("{}{}", pick(FIRST_NAMES), pick(LAST_NAMES)),
        "$randomEmail" => format!(
            "{}.{}@example.com",
            pick(FIRST_NAMES).to_lowercase(),
            pick(LAST_NAMES).to_lowercase()
        ),
        "$randomCity" => pick(CITIES),
        "$randomCompanyName" => pick(COMPANIES),
        "$randomColor" => pick(COLORS),
        "$randomWord" => pick(WORDS),
        "$randomAdjective" => pick(ADJECTIVES),
        "$currentDate" => Local::now().date_naive().to_string(),
        "$randomFutureDate" => {
            (Local::now().date_naive() + TimeDelta::days(fastrand::i64(1..366))).to_string()
        }
        "$timestamp" => Utc::now().timestamp().to_string(),
        "$epoch" => Utc::now().timestamp_millis().to_string(),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_name_generates() {
        let env = Environment::new();
        let vars = DynamicVariables::new();
        for name in BUILTIN_NAMES {
            let value = vars.generate(name, &env);
            assert!(value.is_some_and(|v| !v.is_empty()), "{name} produced nothing");
        }
    }

    #[test]
    fn custom_generator_shadows_builtin() {
        let vars = DynamicVariables::new().with("$randomUUID", |_, _| "fixed".to_string());
        assert_eq!(vars.generate("$randomUUID", &Environment::new()).as_deref(), Some("fixed"));
    }

    #[test]
    fn unknown_name_is_not_dynamic() {
        let vars = DynamicVariables::new();
        assert!(!vars.is_dynamic("orderId"));
        assert!(vars.generate("orderId", &Environment::new()).is_none());
    }
}

use std::collections::BTreeSet;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::environment::Environment;
use crate::error::TemplateError;
use crate::step::{Auth, RequestTemplate};

use super::dynamic::DynamicVariables;

/// Upper bound on nested substitution rounds for a single string.
pub const MAX_RESOLUTION_PASSES: usize = 10;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*?)\}\}").expect("valid regex"));

/// A request with every placeholder substituted, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ResolvedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_template(self) -> RequestTemplate {
        RequestTemplate {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            auth: None,
        }
    }
}

/// Names referenced as `{{name}}` in `input`, in order of first appearance.
pub fn placeholders(input: &str) -> Vec<String> {
    let mut names = IndexSet::new();
    collect_names(input, &mut names);
    names.into_iter().collect()
}

fn collect_names(input: &str, out: &mut IndexSet<String>) {
    for caps in PLACEHOLDER_RE.captures_iter(input) {
        out.insert(caps[1].trim().to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    dynamic: DynamicVariables,
}

impl VariableResolver {
    pub fn new(dynamic: DynamicVariables) -> Self {
        Self { dynamic }
    }

    pub fn dynamic(&self) -> &DynamicVariables {
        &self.dynamic
    }

    /// Resolves every string of a request template against `env`.
    ///
    /// Dynamic variables referenced by the template are generated once and written into `env`
    /// before substitution, so repeated references within a step share one value.
    pub fn resolve_request(
        &self,
        template: &RequestTemplate,
        env: &mut Environment,
    ) -> Result<ResolvedRequest, TemplateError> {
        let mut names = IndexSet::new();
        collect_names(&template.url, &mut names);
        for (k, v) in &template.headers {
            collect_names(k, &mut names);
            collect_names(v, &mut names);
        }
        if let Some(body) = &template.body {
            collect_names(body, &mut names);
        }
        if let Some(Auth::Bearer { token }) = &template.auth {
            collect_names(token, &mut names);
        }
        let mut generated = self.generate(names.iter().map(String::as_str), env);

        let url = self.substitute(&template.url, env, &mut generated)?.trim().to_string();
        let mut headers = Vec::with_capacity(template.headers.len() + 2);
        for (k, v) in &template.headers {
            let key = self.substitute(k, env, &mut generated)?.trim().to_string();
            let value = self.substitute(v, env, &mut generated)?.trim().to_string();
            headers.push((key, value));
        }
        let body = match &template.body {
            Some(b) => Some(self.substitute(b, env, &mut generated)?),
            None => None,
        };

        if let Some(Auth::Bearer { token }) = &template.auth {
            let token = self.substitute(token, env, &mut generated)?;
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
            headers.push(("Authorization".to_string(), format!("Bearer {}", token.trim())));
        }

        if let Some(b) = &body {
            let has_content_type = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
            if !has_content_type && looks_like_json(b) {
                tracing::debug!("detected JSON body, adding application/json content-type");
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
        }

        Ok(ResolvedRequest {
            method: template.method.trim().to_uppercase(),
            url,
            headers,
            body,
        })
    }

    /// Resolves a single string, generating any dynamic variables it references.
    pub fn resolve_str(&self, input: &str, env: &mut Environment) -> Result<String, TemplateError> {
        let names = placeholders(input);
        let mut generated = self.generate(names.iter().map(String::as_str), env);
        self.substitute(input, env, &mut generated)
    }

    fn generate<'a>(
        &self,
        names: impl Iterator<Item = &'a str>,
        env: &mut Environment,
    ) -> BTreeSet<String> {
        let mut generated = BTreeSet::new();
        for name in names {
            if let Some(value) = self.dynamic.generate(name, env) {
                env.set(name, value);
                generated.insert(name.to_string());
            }
        }
        generated
    }

    fn substitute(
        &self,
        input: &str,
        env: &mut Environment,
        generated: &mut BTreeSet<String>,
    ) -> Result<String, TemplateError> {
        let mut current = input.to_string();
        for _ in 0..MAX_RESOLUTION_PASSES {
            if !PLACEHOLDER_RE.is_match(&current) {
                return Ok(current);
            }

            // Placeholders revealed by a previous pass may name dynamic variables too.
            for name in placeholders(&current) {
                if !env.contains_key(&name) && !generated.contains(&name) {
                    if let Some(value) = self.dynamic.generate(&name, env) {
                        env.set(name.clone(), value);
                        generated.insert(name);
                    }
                }
            }

            let mut missing: Option<String> = None;
            let next = PLACEHOLDER_RE.replace_all(&current, |caps: &Captures<'_>| {
                let name = caps[1].trim();
                match env.get_as_text(name) {
                    Some(v) => v,
                    None => {
                        if missing.is_none() {
                            missing = Some(name.to_string());
                        }
                        caps[0].to_string()
                    }
                }
            });
            if let Some(name) = missing {
                return Err(TemplateError::UnresolvedVariable { name });
            }
            current = next.into_owned();
        }

        match placeholders(&current).into_iter().next() {
            Some(name) => Err(TemplateError::UnresolvedVariable { name }),
            None => Ok(current),
        }
    }
}

fn looks_like_json(body: &str) -> bool {
    let trimmed = body.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

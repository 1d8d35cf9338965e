//! Postman collection and environment loading.

mod flatten;
pub mod model;

use serde::de::DeserializeOwned;

use crate::environment::Environment;
use crate::error::{CollectionError, ParseError};
use crate::step::Step;

use model::{CollectionDocument, EnvironmentDocument};

/// Request header carrying comma-separated step tags; stripped from the outgoing request.
pub const TAG_HEADER: &str = "x-stepwise-tags";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedCollection {
    pub name: Option<String>,
    pub steps: Vec<Step>,
    /// Collection-level `variable` entries.
    pub variables: Environment,
    pub format: DocumentFormat,
}

pub fn parse_collection_str(
    input: &str,
    format: DocumentFormat,
) -> Result<ParsedCollection, CollectionError> {
    let (doc, format) = parse_document::<CollectionDocument>(input, format)?;
    if doc.item.is_empty() {
        return Err(CollectionError::Empty);
    }
    let steps = flatten::flatten_items(&doc.item, doc.auth.as_ref())?;
    let variables = doc
        .variable
        .into_iter()
        .filter(|v| !v.disabled)
        .map(|v| (v.key, v.value))
        .collect();
    Ok(ParsedCollection {
        name: doc.info.map(|i| i.name).filter(|n| !n.is_empty()),
        steps,
        variables,
        format,
    })
}

/// Parses a Postman environment export, keeping only enabled values.
pub fn parse_environment_str(input: &str, format: DocumentFormat) -> Result<Environment, ParseError> {
    let (doc, _) = parse_document::<EnvironmentDocument>(input, format)?;
    Ok(doc
        .values
        .into_iter()
        .filter(|v| v.enabled)
        .map(|v| (v.key, v.value))
        .filter(|(_, v)| !v.is_null())
        .collect())
}

/// Later environments override earlier ones; `overrides` wins over all of them.
pub fn merge_environments<I>(environments: I, overrides: &Environment) -> Environment
where
    I: IntoIterator<Item = Environment>,
{
    let mut merged = Environment::new();
    for env in environments {
        merged.extend(env.iter().map(|(k, v)| (k.to_string(), v.clone())));
    }
    merged.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.clone())));
    merged
}

fn parse_document<T: DeserializeOwned>(
    input: &str,
    format: DocumentFormat,
) -> Result<(T, DocumentFormat), ParseError> {
    match format {
        DocumentFormat::Json => Ok((serde_json::from_str(input)?, format)),
        DocumentFormat::Yaml => Ok((serde_yaml::from_str(input)?, format)),
        DocumentFormat::Auto => parse_document_auto(input),
    }
}

fn parse_document_auto<T: DeserializeOwned>(input: &str) -> Result<(T, DocumentFormat), ParseError> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Err(ParseError::UnknownFormat);
    }
    // JSON always starts with `{` or `[`; anything else is tried as YAML first.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<T>(input) {
            Ok(doc) => Ok((doc, DocumentFormat::Json)),
            Err(e) => serde_yaml::from_str::<T>(input)
                .map(|doc| (doc, DocumentFormat::Yaml))
                .map_err(|_| ParseError::Json(e)),
        };
    }
    match serde_yaml::from_str::<T>(input) {
        Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
        Err(e) => serde_json::from_str::<T>(input)
            .map(|doc| (doc, DocumentFormat::Json))
            .map_err(|_| ParseError::Yaml(e)),
    }
}

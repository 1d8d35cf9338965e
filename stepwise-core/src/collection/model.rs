//! Serde shapes for the subset of Postman collection v2.1 that stepwise reads.

use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDocument {
    #[serde(default)]
    pub info: Option<CollectionInfo>,
    #[serde(default)]
    pub item: Vec<ItemDoc>,
    #[serde(default)]
    pub auth: Option<AuthDoc>,
    #[serde(default)]
    pub variable: Vec<VariableDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemDoc {
    #[serde(default)]
    pub name: String,
    /// Present only on folders.
    #[serde(default)]
    pub item: Option<Vec<ItemDoc>>,
    #[serde(default)]
    pub request: Option<RequestDoc>,
    #[serde(default)]
    pub event: Vec<EventDoc>,
    /// Folder-level auth.
    #[serde(default)]
    pub auth: Option<AuthDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestDoc {
    Url(String),
    Full(FullRequestDoc),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullRequestDoc {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub header: Vec<HeaderDoc>,
    #[serde(default)]
    pub url: Option<UrlDoc>,
    #[serde(default)]
    pub body: Option<BodyDoc>,
    #[serde(default)]
    pub auth: Option<AuthDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlDoc {
    Raw(String),
    Structured {
        #[serde(default)]
        raw: Option<String>,
    },
}

impl UrlDoc {
    pub fn raw(&self) -> Option<&str> {
        match self {
            UrlDoc::Raw(s) => Some(s),
            UrlDoc::Structured { raw } => raw.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderDoc {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BodyDoc {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthDoc {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bearer: Vec<AuthParamDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthParamDoc {
    pub key: String,
    #[serde(default)]
    pub value: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDoc {
    pub listen: String,
    #[serde(default)]
    pub script: Option<ScriptDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptDoc {
    #[serde(default)]
    pub exec: ExecDoc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExecDoc {
    Lines(Vec<String>),
    Source(String),
}

impl Default for ExecDoc {
    fn default() -> Self {
        ExecDoc::Lines(Vec::new())
    }
}

impl ExecDoc {
    pub fn joined(&self) -> String {
        match self {
            ExecDoc::Lines(lines) => lines.join("\n"),
            ExecDoc::Source(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDoc {
    pub key: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub disabled: bool,
}

/// Postman environment export: only `enabled` values are honoured.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<EnvValueDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvValueDoc {
    pub key: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

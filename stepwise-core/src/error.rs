use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to auto-detect document format (neither valid JSON nor valid YAML)")]
    UnknownFormat,
}

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("collection has no items")]
    Empty,
    #[error("item '{index}' ({name}) is neither a folder nor a request")]
    MissingRequest { index: String, name: String },
    #[error("step '{index}' has no request url")]
    MissingUrl { index: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unresolved variable '{{{{{name}}}}}'")]
    UnresolvedVariable { name: String },
}

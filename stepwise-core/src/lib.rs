#![forbid(unsafe_code)]

//! Step model, Postman collection loading, and `{{variable}}` resolution.
//!
//! Execution lives in `stepwise-exec`; this crate has no I/O beyond parsing strings.

pub mod collection;
pub mod environment;
pub mod error;
pub mod step;
pub mod template;

pub use crate::collection::{
    merge_environments, parse_collection_str, parse_environment_str, DocumentFormat,
    ParsedCollection, TAG_HEADER,
};
pub use crate::environment::Environment;
pub use crate::error::{CollectionError, ParseError, TemplateError};
pub use crate::step::{Auth, FolderPath, RequestTemplate, Script, ScriptKind, Step};
pub use crate::template::{
    DynamicVariables, ResolvedRequest, VariableResolver, MAX_RESOLUTION_PASSES,
};

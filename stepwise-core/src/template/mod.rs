//! `{{name}}` placeholder resolution and dynamic variable generation.

mod dynamic;
mod resolver;

pub use dynamic::{DynamicGenerator, DynamicVariables, BUILTIN_NAMES};
pub use resolver::{placeholders, ResolvedRequest, VariableResolver, MAX_RESOLUTION_PASSES};

use std::path::Path;

use serde::Serialize;

use crate::cmd::config::load_collection;
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct StepInfo {
    index: String,
    name: String,
    method: String,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Serialize)]
struct StepsResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<String>,
    steps: Vec<StepInfo>,
}

pub async fn steps_cmd(path: &Path, output: OutputArgs) -> i32 {
    let parsed = match load_collection(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let steps = parsed
        .steps
        .iter()
        .map(|s| StepInfo {
            index: s.index.clone(),
            name: s.display_path(),
            method: s.method().to_string(),
            url: s.request.url.clone(),
            tags: s.tags.iter().cloned().collect(),
        })
        .collect();
    let result = StepsResult {
        collection: parsed.name,
        steps,
    };

    if output.format == OutputFormat::Text && !output.quiet {
        if let Some(name) = &result.collection {
            println!("Steps in {name}:");
        }
        for s in &result.steps {
            println!("  {:<6} {:<7} {} -> {}", s.index, s.method, s.name, s.url);
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}

use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EnvironmentArgs {
    /// Postman environment files (JSON or YAML), merged in order.
    #[arg(long = "env", value_name = "FILE")]
    pub env_files: Vec<PathBuf>,
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set_vars: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct HaltArgs {
    /// `any`, `never`, or a comma-separated list of failure kinds.
    #[arg(long, default_value = "any")]
    pub halt_on: String,
    /// Steps whose failures never halt the run.
    #[arg(long = "except", value_name = "STEP")]
    pub except: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    #[arg(long = "run-only", value_name = "STEP")]
    pub run_only: Vec<String>,
    #[arg(long = "skip", value_name = "STEP")]
    pub skip: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct HttpArgs {
    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30000)]
    pub timeout: u64,
    /// Accept invalid TLS certificates.
    #[arg(long)]
    pub insecure: bool,
    /// Treat every HTTP status as success.
    #[arg(long)]
    pub any_status: bool,
    /// Log request and response bodies at debug level.
    #[arg(long)]
    pub log_bodies: bool,
}

use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every step of a collection in order.
    Run {
        path: PathBuf,
        #[command(flatten)]
        env: EnvironmentArgs,
        #[command(flatten)]
        halt: HaltArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        http: HttpArgs,
        /// Where run events go: `log`, `stdout` (JSON lines) or `none`.
        #[arg(long, default_value = "log")]
        events: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the flattened steps of a collection.
    Steps {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Parse a collection and report variables nothing defines.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        env: EnvironmentArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

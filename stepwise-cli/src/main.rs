use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "stepwise", version, about = "Run Postman-style collections as integration tests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = std::env::var("STEPWISE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Run {
            path,
            env,
            halt,
            filter,
            http,
            events,
            output,
        } => cmd::run::run_cmd(&path, &env, &halt, &filter, &http, &events, output).await,
        Command::Steps { path, output } => cmd::steps::steps_cmd(&path, output).await,
        Command::Validate { path, env, output } => cmd::validate::validate_cmd(&path, &env, output).await,
    }
}

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use sqlgate::cli::app::{Cli, Command};
use sqlgate::cli::commands;
use sqlgate::config::{self, GatewayConfig};
use sqlgate::models::EnvelopeFailure;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = cli.command.name();
    println!("sqlgate: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            println!("sqlgate: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("sqlgate: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    config::load_dotenv()?;
    let config = config::load_gateway_config(&cli.runtime.overrides())?;
    init_tracing(&config);
    tracing::debug!(db = %config.db_path.display(), "configuration resolved");

    match &cli.command {
        Command::Check(args) => commands::check::run(args, &config),
        Command::Query(args) => commands::query::run(args, &config),
        Command::Resolve(args) => commands::resolve::run(args, &config),
        Command::Tag(args) => commands::tag::run(args, &config),
        Command::Mapping(args) => commands::mapping::run(args, &config),
        Command::Policy(args) => commands::policy::run(args, &config),
    }
}

/// `RUST_LOG` wins over `LOG_LEVEL`. Logs go to stderr; stdout carries the
/// envelopes.
fn init_tracing(config: &GatewayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<EnvelopeFailure>() {
        Some(failure) if failure.is_rejection() => EXIT_VALIDATION_FAILURE,
        _ => EXIT_RUNTIME_FAILURE,
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

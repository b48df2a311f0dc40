//! vault2pass entry point.

use clap::Parser;
use std::process::ExitCode;
use vault2pass::cli::commands;
use vault2pass::cli::{Cli, Commands};
use vault2pass::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else if let Some(hint) = e.hint() {
                eprintln!("Error: {e}\n  Hint: {hint}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    // Honor RUST_LOG if set, otherwise use the debug flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        None => commands::import::execute(&cli.import, cli.json),
        Some(Commands::Normalize { names }) => commands::normalize::execute(names, cli.json),
        Some(Commands::Completions { shell }) => commands::completions::execute(*shell),
        Some(Commands::Version) => commands::version::execute(cli.json),
    }
}

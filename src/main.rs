//! vcrbpkg CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vcrbpkg::cli::{self, Cli};
use vcrbpkg::report::TracingReporter;
use vcrbpkg::shell::SystemRunner;

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `--log-level` (or `VCRBPKG_LOG_LEVEL`)
/// 3. `RUST_LOG` environment variable (if set)
/// 4. Default is INFO
fn init_tracing(cli: &Cli) {
    let filter = match cli.log_directive() {
        Some(directive) => EnvFilter::new(directive),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vcrbpkg=info"))
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    tracing::debug!("vcrbpkg starting with args: {:?}", cli);

    let runner = SystemRunner::new();
    let reporter = TracingReporter::new();

    match cli::execute(&cli, &runner, &reporter) {
        Ok(outcome) => {
            println!("{}", cli::summary(&outcome));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(stage = e.stage(), "packaging failed");
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

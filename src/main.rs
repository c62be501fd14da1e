//! runnerctl - install and supervise self-hosted CI runners

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use runnerctl::cli::Cli;
use runnerctl::domain::error::find_supervisor_error;
use runnerctl::output::json::format_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => report(&e, json),
    }
}

/// Diagnostics go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "runnerctl=debug",
        _ => "runnerctl=trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn report(err: &anyhow::Error, json: bool) -> ExitCode {
    let (code, exit) = find_supervisor_error(err).map_or(("error", 1), |e| (e.code(), e.exit_code()));
    let message = format!("{err:#}");
    match (json, format_error(&message, code)) {
        (true, Ok(out)) => println!("{out}"),
        _ => eprintln!("Error: {message}"),
    }
    ExitCode::from(exit)
}

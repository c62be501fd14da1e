//! `runnerctl logs`: print the tail of a runner's log.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::logs;

/// Arguments for the logs command.
#[derive(Args)]
pub struct LogsArgs {
    /// Runner name
    pub name: String,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value_t = 50)]
    pub lines: usize,
}

/// Run `runnerctl logs`.
///
/// # Errors
///
/// Returns an error if the log exists but cannot be read.
pub fn run(app: &AppContext, args: &LogsArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let lines = logs::tail(&app.host, &layout, args.lines)?;
    app.renderer()
        .render_logs(&layout.log_file(), lines.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

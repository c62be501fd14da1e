//! `runnerctl status`: show installation and run state of one runner.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::commands::InstanceArgs;

/// Run `runnerctl status`.
///
/// # Errors
///
/// Returns an error if the name is invalid or the state cannot be read.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let status = lifecycle::status(&app.host, &app.config, &layout).await?;
    app.renderer().render_status(&status)?;
    Ok(ExitCode::SUCCESS)
}

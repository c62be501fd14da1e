//! `runnerctl start`: launch a configured runner.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::commands::InstanceArgs;

/// Run `runnerctl start`.
///
/// # Errors
///
/// Returns an error if the runner is not configured or fails to start.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let transition = lifecycle::start(&app.host, &app.config, &layout, &app.reporter()).await?;
    app.renderer().render_transition(&transition)?;
    Ok(ExitCode::SUCCESS)
}

//! `runnerctl stop`: stop a runner, escalating if it ignores termination.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::commands::InstanceArgs;
use crate::output::progress::SpinnerReporter;

/// Run `runnerctl stop`.
///
/// # Errors
///
/// Returns an error if the runner survives forced termination.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let transition = if app.output.show_progress() {
        let spinner = SpinnerReporter::new("stopping runner...");
        let result = lifecycle::stop(&app.host, &app.config, &layout, &spinner).await;
        spinner.clear();
        result?
    } else {
        lifecycle::stop(&app.host, &app.config, &layout, &app.reporter()).await?
    };
    app.renderer().render_transition(&transition)?;
    Ok(ExitCode::SUCCESS)
}

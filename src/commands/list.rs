//! `runnerctl list`: status of every runner under the root.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;

/// Run `runnerctl list`.
///
/// # Errors
///
/// Returns an error if the runners directory cannot be read.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let statuses = lifecycle::list(&app.host, &app.config, &app.root).await?;
    app.renderer().render_list(&statuses)?;
    Ok(ExitCode::SUCCESS)
}

//! `runnerctl uninstall`: stop, de-register and delete a runner.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::domain::RepositoryTarget;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Runner name
    pub name: String,

    /// Registration target to remove from, overriding the recorded one
    #[arg(long, value_name = "TARGET")]
    pub repo: Option<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Run `runnerctl uninstall`.
///
/// # Errors
///
/// Returns an error if the runner directory cannot be removed.
pub async fn run(app: &AppContext, args: &UninstallArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let repository: Option<RepositoryTarget> =
        args.repo.as_deref().map(str::parse).transpose()?;

    if !app.confirm(
        &format!("Remove runner '{}' and all its files?", layout.name()),
        true,
    )? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let transition = lifecycle::uninstall(
        &app.host,
        &app.config,
        &layout,
        repository.as_ref(),
        &app.reporter(),
    )
    .await?;
    app.renderer().render_transition(&transition)?;
    Ok(ExitCode::SUCCESS)
}

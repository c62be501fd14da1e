//! `runnerctl setup`: install, register and start a runner.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::{self, SetupRequest};
use crate::domain::instance::validate_sha256;
use crate::domain::{RegistrationToken, RepositoryTarget};

/// Arguments for the setup command.
#[derive(Args)]
pub struct SetupArgs {
    /// Runner name
    pub name: String,

    /// Where to register: owner/repo, an organization, or a URL
    #[arg(long, value_name = "TARGET")]
    pub repo: String,

    /// Registration token (requested with the API token when omitted)
    #[arg(long, env = "RUNNER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Extra labels, comma separated
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Work directory for jobs (default: _work inside the runner directory)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<String>,

    /// Replace an existing registration with the same name
    #[arg(long)]
    pub replace: bool,

    /// Runner release to install (default from config)
    #[arg(long, value_name = "VERSION")]
    pub runner_version: Option<String>,

    /// Expected SHA-256 of the release archive
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

/// Run `runnerctl setup`.
///
/// # Errors
///
/// Returns an error if any setup phase fails.
pub async fn run(app: &AppContext, args: SetupArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let repository: RepositoryTarget = args.repo.parse()?;
    let sha256 = args.sha256.as_deref().map(validate_sha256).transpose()?;
    let request = SetupRequest {
        repository,
        labels: args.labels,
        work_dir: args.work_dir,
        token: args.token.as_deref().and_then(RegistrationToken::new),
        replace: args.replace,
        runner_version: args.runner_version,
        sha256,
    };

    let transition =
        lifecycle::setup(&app.host, &app.config, &layout, request, &app.reporter()).await?;
    app.renderer().render_transition(&transition)?;
    app.output
        .info(&format!("Logs: runnerctl logs {}", layout.name()));
    Ok(ExitCode::SUCCESS)
}

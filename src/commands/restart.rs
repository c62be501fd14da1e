//! `runnerctl restart`: stop then start a runner.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::StateObserver;
use crate::application::services::lifecycle;
use crate::commands::InstanceArgs;
use crate::domain::RunState;

/// Logs every state the restart passes through.
struct TraceObserver<'a> {
    name: &'a str,
}

impl StateObserver for TraceObserver<'_> {
    fn observe(&self, state: RunState) {
        tracing::debug!(instance = self.name, ?state, "observed run state");
    }
}

/// Run `runnerctl restart`.
///
/// # Errors
///
/// Returns an error if the stop or the start fails.
pub async fn run(app: &AppContext, args: &InstanceArgs) -> Result<ExitCode> {
    let layout = app.layout(&args.name)?;
    let observer = TraceObserver { name: &args.name };
    let transition =
        lifecycle::restart(&app.host, &app.config, &layout, &app.reporter(), &observer).await?;
    app.renderer().render_transition(&transition)?;
    Ok(ExitCode::SUCCESS)
}

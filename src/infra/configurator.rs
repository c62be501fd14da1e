//! Infrastructure implementation of the `WorkerConfigurator` port.
//!
//! Drives the unpacked `config.sh` non-interactively from the runner
//! directory.

use anyhow::Result;

use crate::application::ports::{RegistrationRequest, WorkerConfigurator};
use crate::domain::{InstanceLayout, RegistrationToken};
use crate::infra::SystemHost;
use crate::infra::command_runner::output_tail;

/// The configuration tool refuses to run as root unless told otherwise.
fn root_env() -> Vec<(&'static str, &'static str)> {
    if nix::unistd::geteuid().is_root() {
        vec![("RUNNER_ALLOW_RUNASROOT", "1")]
    } else {
        Vec::new()
    }
}

impl WorkerConfigurator for SystemHost {
    async fn register(
        &self,
        layout: &InstanceLayout,
        request: &RegistrationRequest<'_>,
    ) -> Result<()> {
        let labels = request.labels.join(",");
        let mut args = vec![
            "--unattended",
            "--url",
            request.service_url,
            "--token",
            request.token.expose(),
            "--name",
            request.name,
            "--work",
            request.work_dir,
        ];
        if !labels.is_empty() {
            args.extend(["--labels", labels.as_str()]);
        }
        if request.replace {
            args.push("--replace");
        }
        let output = self
            .commands
            .run_in(&layout.runner_dir(), &layout.config_tool(), &args, &root_env())
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "config.sh exited with {}: {}",
            output.status,
            output_tail(&output, 5)
        );
        Ok(())
    }

    async fn unregister(&self, layout: &InstanceLayout, token: &RegistrationToken) -> Result<()> {
        let output = self
            .commands
            .run_in(
                &layout.runner_dir(),
                &layout.config_tool(),
                &["remove", "--token", token.expose()],
                &root_env(),
            )
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "config.sh remove exited with {}: {}",
            output.status,
            output_tail(&output, 5)
        );
        Ok(())
    }
}

//! One-time registration of a runner with the coordination service.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{
    CoordinationService, LocalFs, ProgressReporter, RegistrationRequest, WorkerConfigurator,
};
use crate::application::services::installer::installation_state;
use crate::domain::{
    InstallationState, InstanceLayout, RegistrationToken, RepositoryTarget, SupervisorConfig,
    SupervisorError, TokenKind,
};

/// Result of [`configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigureOutcome {
    AlreadyConfigured,
    Configured,
}

impl ConfigureOutcome {
    #[must_use]
    pub fn summary(self) -> &'static str {
        match self {
            Self::AlreadyConfigured => "runner already registered",
            Self::Configured => "runner registered",
        }
    }
}

/// Registration parameters supplied by the operator.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureParams<'a> {
    pub repository: &'a RepositoryTarget,
    pub labels: &'a [String],
    pub work_dir: &'a str,
    pub replace: bool,
}

/// Register the runner unless the configuration marker already exists.
///
/// Uses `token` when supplied, otherwise asks the coordination service for a
/// fresh registration token.
///
/// # Errors
///
/// Returns `SupervisorError::Config` if the binaries are missing, no token
/// can be obtained, the configuration tool fails, or it finishes without
/// writing the marker.
pub async fn configure(
    host: &(impl LocalFs + CoordinationService + WorkerConfigurator),
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    params: &ConfigureParams<'_>,
    token: Option<RegistrationToken>,
    reporter: &impl ProgressReporter,
) -> Result<ConfigureOutcome> {
    match installation_state(host, layout) {
        InstallationState::Configured => return Ok(ConfigureOutcome::AlreadyConfigured),
        InstallationState::NotInstalled => {
            return Err(SupervisorError::Config(
                "runner binaries are not installed".to_string(),
            )
            .into());
        }
        InstallationState::Installed => {}
    }

    let token = match token {
        Some(token) => token,
        None => {
            reporter.step("requesting registration token...");
            host.issue_token(params.repository, TokenKind::Registration)
                .await
                .map_err(|e| {
                    SupervisorError::Config(format!(
                        "could not obtain a registration token for {}: {e:#}",
                        params.repository
                    ))
                })?
        }
    };

    let service_url = params.repository.service_url(&config.service_url);
    reporter.step(&format!(
        "registering runner '{}' with {service_url}...",
        layout.name()
    ));
    tracing::info!(instance = layout.name(), %service_url, "running configuration tool");
    let request = RegistrationRequest {
        service_url: &service_url,
        token: &token,
        name: layout.name(),
        labels: params.labels,
        work_dir: params.work_dir,
        replace: params.replace,
    };
    host.register(layout, &request)
        .await
        .map_err(|e| SupervisorError::Config(format!("registration failed: {e:#}")))?;

    if !host.exists(&layout.config_marker()) {
        return Err(SupervisorError::Config(
            "configuration tool finished without writing its marker file".to_string(),
        )
        .into());
    }
    Ok(ConfigureOutcome::Configured)
}

/// Remove the runner's registration using a fresh removal token.
///
/// # Errors
///
/// Returns an error if no removal token can be obtained or the
/// configuration tool fails.
pub async fn deregister(
    host: &(impl CoordinationService + WorkerConfigurator),
    layout: &InstanceLayout,
    repository: &RepositoryTarget,
) -> Result<()> {
    let token = host
        .issue_token(repository, TokenKind::Removal)
        .await
        .with_context(|| format!("requesting removal token for {repository}"))?;
    host.unregister(layout, &token)
        .await
        .context("running configuration tool")?;
    Ok(())
}

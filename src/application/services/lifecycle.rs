//! Lifecycle orchestrator: the operator-facing operations.
//!
//! Every mutating operation runs under the per-instance lock and reports the
//! instance status observed before and after the transition.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::application::ports::{
    HostPorts, InstanceLocker, InstanceStore, LocalFs, ProcessTable, ProgressReporter,
    StateObserver,
};
use crate::application::services::installer::{
    self, ArtifactRequest, InstallOutcome, installation_state,
};
use crate::application::services::registration::{self, ConfigureOutcome, ConfigureParams};
use crate::application::services::supervisor::{
    self, Reconcile, RestartOutcome, StartOutcome, StopOutcome,
};
use crate::domain::error::find_supervisor_error;
use crate::domain::instance::{runners_dir, validate_instance_name, validate_runner_version};
use crate::domain::platform::{self, Platform, default_labels};
use crate::domain::state::uptime;
use crate::domain::{
    InstallationState, InstanceLayout, InstanceRecord, InstanceStatus, RegistrationToken,
    RepositoryTarget, SupervisorConfig, SupervisorError,
};

/// A completed operation with the status seen on either side of it.
#[derive(Debug, Clone, Serialize)]
pub struct Transition<O> {
    pub before: InstanceStatus,
    pub outcome: O,
    pub after: InstanceStatus,
}

/// Operator input for [`setup`].
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub repository: RepositoryTarget,
    /// Extra labels, appended to the platform defaults.
    pub labels: Vec<String>,
    pub work_dir: Option<String>,
    /// Registration token; `None` requests one from the coordination service.
    pub token: Option<RegistrationToken>,
    pub replace: bool,
    /// Overrides the configured runner version.
    pub runner_version: Option<String>,
    pub sha256: Option<String>,
}

/// What [`setup`] did in each phase.
#[derive(Debug, Clone, Serialize)]
pub struct SetupOutcome {
    pub platform: Platform,
    pub install: InstallOutcome,
    pub configure: ConfigureOutcome,
    pub start: StartOutcome,
}

/// What [`uninstall`] did. Stop and de-registration are best effort.
#[derive(Debug, Clone, Serialize)]
pub struct UninstallOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopOutcome>,
    pub deregistered: bool,
    pub removed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Report the current status of one instance.
///
/// Stale PID records are healed when the instance lock is free; while
/// another operation holds it the status is computed without writing.
///
/// # Errors
///
/// Returns an error if the lock file cannot be created or the PID record
/// cannot be rewritten.
pub async fn status(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
) -> Result<InstanceStatus> {
    let guard = match host.lock(layout, std::time::Duration::ZERO).await {
        Ok(guard) => Some(guard),
        Err(e) if matches!(find_supervisor_error(&e), Some(SupervisorError::Busy(_))) => None,
        Err(e) => return Err(e),
    };
    let mode = if guard.is_some() {
        Reconcile::Heal
    } else {
        Reconcile::ReadOnly
    };
    snapshot(host, config, layout, mode).await
}

/// Status of every instance under `root`, sorted by name.
///
/// # Errors
///
/// Returns an error if the runners directory cannot be read.
pub async fn list(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    root: &Path,
) -> Result<Vec<InstanceStatus>> {
    let mut statuses = Vec::new();
    for name in host.list_dirs(&runners_dir(root))? {
        if validate_instance_name(&name).is_err() {
            tracing::debug!(%name, "skipping directory that is not an instance");
            continue;
        }
        let layout = InstanceLayout::new(root, &name)?;
        statuses.push(status(host, config, &layout).await?);
    }
    Ok(statuses)
}

/// Install, register and start a runner. Each phase is skipped when its
/// postcondition already holds, so repeating a setup is harmless.
///
/// # Errors
///
/// Returns the `SupervisorError` of the first phase that fails.
pub async fn setup(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    request: SetupRequest,
    reporter: &impl ProgressReporter,
) -> Result<Transition<SetupOutcome>> {
    let _guard = host.lock(layout, config.timing.lock_timeout()).await?;
    let before = snapshot(host, config, layout, Reconcile::Heal).await?;

    let platform = platform::detect()?;
    let version = match &request.runner_version {
        Some(v) => validate_runner_version(v)?,
        None => config.runner_version.clone(),
    };
    let labels = default_labels(platform, &request.labels);
    let work_dir = request
        .work_dir
        .clone()
        .unwrap_or_else(|| InstanceLayout::default_work_dir().to_string());

    let install = installer::install(
        host,
        host,
        config,
        layout,
        &ArtifactRequest {
            platform,
            version: &version,
            sha256: request.sha256.as_deref(),
        },
        reporter,
    )
    .await?;

    let params = ConfigureParams {
        repository: &request.repository,
        labels: &labels,
        work_dir: &work_dir,
        replace: request.replace,
    };
    let configure =
        registration::configure(host, config, layout, &params, request.token, reporter).await?;
    record_setup(host, layout, &request.repository, labels, work_dir, version, configure, reporter)
        .await?;

    let start = supervisor::start(host, config, layout, reporter).await?;
    let after = snapshot(host, config, layout, Reconcile::Heal).await?;
    Ok(Transition {
        before,
        outcome: SetupOutcome {
            platform,
            install,
            configure,
            start,
        },
        after,
    })
}

/// Persist the setup record after a fresh registration, or when an already
/// registered instance has none.
#[allow(clippy::too_many_arguments)]
async fn record_setup(
    host: &impl InstanceStore,
    layout: &InstanceLayout,
    repository: &RepositoryTarget,
    labels: Vec<String>,
    work_dir: String,
    runner_version: String,
    configure: ConfigureOutcome,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let existing = host.load_record(layout).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable instance record");
        None
    });
    if configure == ConfigureOutcome::AlreadyConfigured
        && let Some(record) = &existing
    {
        if &record.repository != repository {
            reporter.warn(&format!(
                "runner is already registered with {}; ignoring --repo {repository}. \
                 Uninstall it first to move it.",
                record.repository
            ));
        }
        return Ok(());
    }
    let record = InstanceRecord {
        name: layout.name().to_string(),
        repository: repository.clone(),
        labels,
        work_dir,
        runner_version,
        created_at: Utc::now(),
    };
    host.save_record(layout, &record).await
}

/// Start a configured runner.
///
/// # Errors
///
/// See [`supervisor::start`].
pub async fn start(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
) -> Result<Transition<StartOutcome>> {
    let _guard = host.lock(layout, config.timing.lock_timeout()).await?;
    let before = snapshot(host, config, layout, Reconcile::Heal).await?;
    let outcome = supervisor::start(host, config, layout, reporter).await?;
    let after = snapshot(host, config, layout, Reconcile::Heal).await?;
    Ok(Transition {
        before,
        outcome,
        after,
    })
}

/// Stop a runner.
///
/// # Errors
///
/// See [`supervisor::stop`].
pub async fn stop(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
) -> Result<Transition<StopOutcome>> {
    let _guard = host.lock(layout, config.timing.lock_timeout()).await?;
    let before = snapshot(host, config, layout, Reconcile::Heal).await?;
    let outcome = supervisor::stop(host, config, layout, reporter).await?;
    let after = snapshot(host, config, layout, Reconcile::Heal).await?;
    Ok(Transition {
        before,
        outcome,
        after,
    })
}

/// Restart a runner.
///
/// # Errors
///
/// See [`supervisor::restart`].
pub async fn restart(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
    observer: &impl StateObserver,
) -> Result<Transition<RestartOutcome>> {
    let _guard = host.lock(layout, config.timing.lock_timeout()).await?;
    let before = snapshot(host, config, layout, Reconcile::Heal).await?;
    let outcome = supervisor::restart(host, config, layout, reporter, observer).await?;
    let after = snapshot(host, config, layout, Reconcile::Heal).await?;
    Ok(Transition {
        before,
        outcome,
        after,
    })
}

/// Stop, de-register and delete a runner.
///
/// Stop and de-registration failures become warnings; the base directory is
/// removed regardless. `repository` overrides the recorded target.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the base directory
/// cannot be removed.
pub async fn uninstall(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    repository: Option<&RepositoryTarget>,
    reporter: &impl ProgressReporter,
) -> Result<Transition<UninstallOutcome>> {
    let _guard = host.lock(layout, config.timing.lock_timeout()).await?;
    let before = snapshot(host, config, layout, Reconcile::Heal).await?;
    let mut warnings = Vec::new();

    let stop = match supervisor::stop(host, config, layout, reporter).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warnings.push(format!("could not stop runner: {e:#}"));
            None
        }
    };

    let mut deregistered = false;
    if before.installation == InstallationState::Configured {
        let target = repository
            .cloned()
            .or_else(|| before.record.as_ref().map(|r| r.repository.clone()));
        match target {
            Some(target) => {
                reporter.step(&format!("removing registration from {target}..."));
                match registration::deregister(host, layout, &target).await {
                    Ok(()) => deregistered = true,
                    Err(e) => warnings.push(format!("could not de-register runner: {e:#}")),
                }
            }
            None => warnings.push(
                "no repository recorded for this runner; skipping de-registration".to_string(),
            ),
        }
    }

    for warning in &warnings {
        tracing::warn!(instance = layout.name(), "{warning}");
        reporter.warn(warning);
    }

    let removed = host.exists(layout.base_dir());
    if removed {
        reporter.step("removing runner files...");
        host.remove_dir_all(layout.base_dir())?;
    }

    let after = snapshot(host, config, layout, Reconcile::ReadOnly).await?;
    Ok(Transition {
        before,
        outcome: UninstallOutcome {
            stop,
            deregistered,
            removed,
            warnings,
        },
        after,
    })
}

async fn snapshot(
    host: &impl HostPorts,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    mode: Reconcile,
) -> Result<InstanceStatus> {
    let installation = installation_state(host, layout);
    let run = supervisor::locate(host, config, layout, mode).await?;
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    let uptime_seconds = run
        .pid()
        .and_then(|pid| host.inspect(pid))
        .and_then(|process| uptime(process.start_time, now));
    let record = if host.exists(layout.base_dir()) {
        host.load_record(layout).await.unwrap_or_else(|e| {
            tracing::warn!(instance = layout.name(), error = %e, "ignoring unreadable instance record");
            None
        })
    } else {
        None
    };
    Ok(InstanceStatus {
        name: layout.name().to_string(),
        base_dir: layout.base_dir().to_path_buf(),
        installation,
        run,
        uptime_seconds,
        log_file: layout.log_file(),
        record,
    })
}

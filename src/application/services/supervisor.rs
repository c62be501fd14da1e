//! Worker process supervision: locate, start, stop, restart.
//!
//! The PID file is a hint. A worker counts as running only when a live
//! process passes [`PidRecord::is_valid_for`]; otherwise the record is
//! discarded and the process table is scanned for a matching worker.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::time::{Instant, sleep};

use crate::application::ports::{
    InstanceStore, LaunchSpec, LaunchedWorker, LocalFs, ProcessSignaller, ProcessTable,
    ProgressReporter, Signal, StateObserver, WorkerLauncher,
};
use crate::application::services::installer::installation_state;
use crate::domain::{
    InstallationState, InstanceLayout, PidRecord, ProcessSnapshot, RunState, SupervisorConfig,
    SupervisorError, WorkerSignature,
};

/// Whether [`locate`] may rewrite the PID record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Discard stale records and persist recovered pids. Requires the lock.
    Heal,
    /// Report only.
    ReadOnly,
}

/// Result of [`start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StartOutcome {
    AlreadyRunning { pid: u32 },
    Started { pid: u32 },
}

impl StartOutcome {
    #[must_use]
    pub fn pid(self) -> u32 {
        match self {
            Self::AlreadyRunning { pid } | Self::Started { pid } => pid,
        }
    }

    #[must_use]
    pub fn summary(self) -> String {
        match self {
            Self::AlreadyRunning { pid } => format!("runner already running (pid {pid})"),
            Self::Started { pid } => format!("runner started (pid {pid})"),
        }
    }
}

/// Result of [`stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StopOutcome {
    AlreadyStopped,
    Stopped { pid: u32, forced: bool },
}

impl StopOutcome {
    #[must_use]
    pub fn summary(self) -> String {
        match self {
            Self::AlreadyStopped => "runner is not running".to_string(),
            Self::Stopped { pid, forced: false } => format!("runner stopped (pid {pid})"),
            Self::Stopped { pid, forced: true } => {
                format!("runner killed after ignoring termination (pid {pid})")
            }
        }
    }
}

/// Result of [`restart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestartOutcome {
    pub stop: StopOutcome,
    pub start: StartOutcome,
}

/// Find the live worker of `layout`, if any.
///
/// # Errors
///
/// Returns an error only if the PID record cannot be rewritten in
/// [`Reconcile::Heal`] mode.
pub async fn locate(
    host: &(impl ProcessTable + InstanceStore),
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    mode: Reconcile,
) -> Result<RunState> {
    let signature = WorkerSignature::for_layout(&config.worker_signature, layout);

    if let Some(record) = host.load_pid(layout).await {
        if is_alive(host, &record, &signature) {
            return Ok(RunState::Running { pid: record.pid });
        }
        tracing::info!(instance = layout.name(), pid = record.pid, "pid record is stale");
        if mode == Reconcile::Heal {
            host.clear_pid(layout).await?;
        }
    }

    let Some(process) = host
        .scan()
        .into_iter()
        .filter(|p| signature.matches(p))
        .min_by_key(|p| (p.start_time, p.pid))
    else {
        return Ok(RunState::Stopped);
    };

    tracing::info!(
        instance = layout.name(),
        pid = process.pid,
        "found running worker in process table"
    );
    if mode == Reconcile::Heal {
        host.save_pid(layout, &PidRecord::from_snapshot(&process))
            .await?;
    }
    Ok(RunState::Running { pid: process.pid })
}

/// Launch the worker unless it is already running.
///
/// # Errors
///
/// Returns `SupervisorError::Config` if the instance is not configured and
/// `SupervisorError::Start` if the worker cannot be launched or exits
/// within the confirmation window. No PID record is left behind on failure,
/// and a launched process that fails confirmation is killed.
pub async fn start(
    host: &(impl LocalFs + ProcessTable + ProcessSignaller + WorkerLauncher + InstanceStore),
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
) -> Result<StartOutcome> {
    if installation_state(host, layout) != InstallationState::Configured {
        return Err(SupervisorError::Config(format!(
            "runner '{name}' is not configured. Run 'runnerctl setup {name} --repo <owner/repo>' first.",
            name = layout.name()
        ))
        .into());
    }
    if let RunState::Running { pid } = locate(host, config, layout, Reconcile::Heal).await? {
        return Ok(StartOutcome::AlreadyRunning { pid });
    }

    let log_file = layout.log_file();
    let program = layout.run_entry();
    let working_dir = layout.runner_dir();
    reporter.step("launching runner...");
    let spec = LaunchSpec {
        program: &program,
        working_dir: &working_dir,
        log_file: &log_file,
    };
    let mut worker = host.launch(&spec).map_err(|e| {
        e.context(SupervisorError::Start {
            log: log_file.clone(),
        })
    })?;
    let pid = worker.pid();
    tracing::info!(instance = layout.name(), pid, "worker launched, confirming");

    let signature = WorkerSignature::for_layout(&config.worker_signature, layout);
    let confirmed = confirm_alive(host, &mut worker, &signature, config).await?;
    let Some(process) = confirmed else {
        tracing::warn!(instance = layout.name(), pid, "worker failed confirmation");
        discard_unconfirmed(host, &mut worker, config).await?;
        host.clear_pid(layout).await?;
        return Err(SupervisorError::Start { log: log_file }.into());
    };

    host.save_pid(layout, &PidRecord::from_snapshot(&process))
        .await
        .context("writing pid record")?;
    Ok(StartOutcome::Started { pid })
}

/// Watch the fresh worker for the confirmation window, then require a live
/// process that matches the signature.
async fn confirm_alive(
    host: &impl ProcessTable,
    worker: &mut impl LaunchedWorker,
    signature: &WorkerSignature,
    config: &SupervisorConfig,
) -> Result<Option<ProcessSnapshot>> {
    let deadline = Instant::now() + config.timing.start_confirm();
    loop {
        if worker.has_exited()? {
            return Ok(None);
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(config.timing.stop_poll().min(deadline - now)).await;
    }
    Ok(host
        .inspect(worker.pid())
        .filter(|process| signature.matches(process)))
}

/// Kill a launched process that did not confirm as the worker, so a failed
/// start never leaves it running behind an empty PID record.
async fn discard_unconfirmed(
    host: &(impl ProcessTable + ProcessSignaller),
    worker: &mut impl LaunchedWorker,
    config: &SupervisorConfig,
) -> Result<()> {
    let pid = worker.pid();
    if worker.has_exited()? {
        return Ok(());
    }
    tracing::warn!(pid, "launched process does not match the worker signature, killing it");
    host.signal(pid, Signal::Forceful)
        .map_err(|e| e.context(SupervisorError::Stop { pid }))?;
    let deadline = Instant::now() + config.timing.kill_grace();
    loop {
        if worker.has_exited()? || host.inspect(pid).is_none_or(|p| p.zombie) {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(SupervisorError::Stop { pid }.into());
        }
        sleep(config.timing.stop_poll().min(deadline - now)).await;
    }
}

/// Stop the worker: graceful signal, bounded wait, forceful signal.
///
/// Stopping an instance with no live worker is a successful no-op.
///
/// # Errors
///
/// Returns `SupervisorError::Stop` if the worker cannot be signalled or
/// survives the forceful signal; its PID record is kept in that case.
pub async fn stop(
    host: &(impl ProcessTable + ProcessSignaller + InstanceStore),
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
) -> Result<StopOutcome> {
    let RunState::Running { pid } = locate(host, config, layout, Reconcile::Heal).await? else {
        host.clear_pid(layout).await?;
        return Ok(StopOutcome::AlreadyStopped);
    };

    let signature = WorkerSignature::for_layout(&config.worker_signature, layout);
    let target = PidRecord {
        pid,
        start_time: host.inspect(pid).map_or(0, |p| p.start_time),
    };
    let timing = config.timing;

    reporter.step(&format!("stopping runner (pid {pid})..."));
    host.signal(pid, Signal::Graceful)
        .map_err(|e| e.context(SupervisorError::Stop { pid }))?;
    if wait_for_exit(host, &target, &signature, timing.stop_grace(), timing.stop_poll()).await {
        host.clear_pid(layout).await?;
        return Ok(StopOutcome::Stopped { pid, forced: false });
    }

    tracing::warn!(instance = layout.name(), pid, "worker ignored termination, killing");
    reporter.warn(&format!(
        "runner did not exit within {}s, forcing termination",
        timing.stop_grace().as_secs()
    ));
    host.signal(pid, Signal::Forceful)
        .map_err(|e| e.context(SupervisorError::Stop { pid }))?;
    if wait_for_exit(host, &target, &signature, timing.kill_grace(), timing.stop_poll()).await {
        host.clear_pid(layout).await?;
        return Ok(StopOutcome::Stopped { pid, forced: true });
    }

    Err(SupervisorError::Stop { pid }.into())
}

/// Stop then start, reporting every observed run state to `observer`.
///
/// # Errors
///
/// Propagates stop failures without attempting a start, and returns
/// `SupervisorError::Stop` if a worker is still found after stopping.
pub async fn restart(
    host: &(impl LocalFs + ProcessTable + ProcessSignaller + WorkerLauncher + InstanceStore),
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    reporter: &impl ProgressReporter,
    observer: &impl StateObserver,
) -> Result<RestartOutcome> {
    observer.observe(locate(host, config, layout, Reconcile::Heal).await?);

    let stopped = stop(host, config, layout, reporter).await?;
    let settled = locate(host, config, layout, Reconcile::Heal).await?;
    observer.observe(settled);
    if let RunState::Running { pid } = settled {
        return Err(SupervisorError::Stop { pid }.into());
    }

    sleep(config.timing.restart_settle()).await;
    let started = start(host, config, layout, reporter).await?;
    observer.observe(locate(host, config, layout, Reconcile::Heal).await?);

    Ok(RestartOutcome {
        stop: stopped,
        start: started,
    })
}

fn is_alive(host: &impl ProcessTable, record: &PidRecord, signature: &WorkerSignature) -> bool {
    host.inspect(record.pid)
        .is_some_and(|process| record.is_valid_for(&process, signature))
}

async fn wait_for_exit(
    host: &impl ProcessTable,
    target: &PidRecord,
    signature: &WorkerSignature,
    within: Duration,
    poll: Duration,
) -> bool {
    let deadline = Instant::now() + within;
    loop {
        if !is_alive(host, target, signature) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(poll.min(deadline - now)).await;
    }
}

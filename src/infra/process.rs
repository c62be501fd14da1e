//! OS process access: implements `ProcessTable`, `ProcessSignaller` and
//! `WorkerLauncher`.
//!
//! The process table comes from `sysinfo`, signals are delivered with `nix`,
//! and the worker is spawned with `tokio::process` in its own process group.

use std::fs::OpenOptions;
use std::process::Stdio;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal as NixSignal};
use nix::unistd::{Pid as NixPid, getpgid};
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

use crate::application::ports::{
    LaunchSpec, LaunchedWorker, ProcessSignaller, ProcessTable, Signal, WorkerLauncher,
};
use crate::domain::ProcessSnapshot;
use crate::infra::SystemHost;

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always)
}

fn snapshot(process: &Process) -> ProcessSnapshot {
    ProcessSnapshot {
        pid: process.pid().as_u32(),
        start_time: process.start_time(),
        cmdline: process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
        zombie: matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
    }
}

impl ProcessTable for SystemHost {
    fn inspect(&self, pid: u32) -> Option<ProcessSnapshot> {
        let target = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, refresh_kind());
        system.process(target).map(snapshot)
    }

    fn scan(&self) -> Vec<ProcessSnapshot> {
        let own = std::process::id();
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none() && p.pid().as_u32() != own)
            .map(snapshot)
            .collect()
    }
}

impl ProcessSignaller for SystemHost {
    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        anyhow::ensure!(pid > 1, "refusing to signal pid {pid}");
        let target = NixPid::from_raw(i32::try_from(pid).context("pid out of range")?);
        let sig = match signal {
            Signal::Graceful => NixSignal::SIGTERM,
            Signal::Forceful => NixSignal::SIGKILL,
        };
        // The worker leads its own group; signalling the group reaches the
        // listener processes it forks.
        let sent = match getpgid(Some(target)) {
            Ok(group) if group == target => signal::killpg(group, sig),
            Ok(_) => signal::kill(target, sig),
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) | Err(Errno::ESRCH) => {
                tracing::debug!(pid, signal = %sig, "signal delivered");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("sending {sig} to pid {pid}")),
        }
    }
}

/// A worker spawned by [`SystemHost`]. Dropping it leaves the process running.
pub struct SpawnedWorker {
    child: tokio::process::Child,
    pid: u32,
}

impl LaunchedWorker for SpawnedWorker {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn has_exited(&mut self) -> Result<bool> {
        let status = self.child.try_wait().context("polling launched worker")?;
        if let Some(status) = status {
            tracing::debug!(pid = self.pid, %status, "worker exited");
        }
        Ok(status.is_some())
    }
}

impl WorkerLauncher for SystemHost {
    type Worker = SpawnedWorker;

    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<SpawnedWorker> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(spec.log_file)
            .with_context(|| format!("opening log file {}", spec.log_file.display()))?;
        let log_err = log.try_clone().context("duplicating log file handle")?;

        let child = tokio::process::Command::new(spec.program)
            .current_dir(spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .process_group(0)
            .kill_on_drop(false)
            .spawn()
            .with_context(|| format!("failed to spawn {}", spec.program.display()))?;
        let pid = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("spawned worker has no pid"))?;
        Ok(SpawnedWorker { child, pid })
    }
}

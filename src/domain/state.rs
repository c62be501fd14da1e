//! Installation and run state, PID records, and the worker signature rule.
//!
//! Nothing here is trusted from disk alone: a [`PidRecord`] only becomes a
//! [`RunState::Running`] after [`PidRecord::is_valid_for`] accepts a live
//! process snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::instance::{InstanceLayout, InstanceRecord};

/// Installation progress, derived from files in the base directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationState {
    NotInstalled,
    Installed,
    Configured,
}

impl InstallationState {
    /// Derive the state from two filesystem observations.
    #[must_use]
    pub fn derive(binaries_present: bool, marker_present: bool) -> Self {
        match (binaries_present, marker_present) {
            (false, _) => Self::NotInstalled,
            (true, false) => Self::Installed,
            (true, true) => Self::Configured,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not installed",
            Self::Installed => "installed",
            Self::Configured => "configured",
        }
    }
}

/// Whether the worker process is alive, as observed at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running { pid: u32 },
}

impl RunState {
    #[must_use]
    pub fn pid(self) -> Option<u32> {
        match self {
            Self::Stopped => None,
            Self::Running { pid } => Some(pid),
        }
    }

    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// A point-in-time view of one entry in the OS process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    /// Start time in seconds since the Unix epoch.
    pub start_time: u64,
    pub cmdline: Vec<String>,
    /// Exited but not yet reaped.
    pub zombie: bool,
}

/// Cached hint of the worker's pid, persisted to `runner.pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,
    /// Process start time when the record was written; `0` means unknown.
    #[serde(default)]
    pub start_time: u64,
}

impl PidRecord {
    #[must_use]
    pub fn from_snapshot(process: &ProcessSnapshot) -> Self {
        Self {
            pid: process.pid,
            start_time: process.start_time,
        }
    }

    /// A record is valid only if the live process has the same pid, the same
    /// start time (when known) and matches the worker signature.
    #[must_use]
    pub fn is_valid_for(&self, process: &ProcessSnapshot, signature: &WorkerSignature) -> bool {
        process.pid == self.pid
            && (self.start_time == 0 || self.start_time == process.start_time)
            && signature.matches(process)
    }
}

/// Recognizes the worker of one particular instance in the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSignature {
    image: String,
    instance_dir: String,
}

impl WorkerSignature {
    /// `image` is the fixed substring every worker command line contains;
    /// `runner_dir` distinguishes this instance from its siblings.
    #[must_use]
    pub fn new(image: &str, runner_dir: &Path) -> Self {
        let mut instance_dir = runner_dir.to_string_lossy().into_owned();
        if !instance_dir.ends_with('/') {
            instance_dir.push('/');
        }
        Self {
            image: image.to_string(),
            instance_dir,
        }
    }

    #[must_use]
    pub fn for_layout(image: &str, layout: &InstanceLayout) -> Self {
        Self::new(image, &layout.runner_dir())
    }

    /// Zombies never match; their command line is gone anyway.
    #[must_use]
    pub fn matches(&self, process: &ProcessSnapshot) -> bool {
        if process.zombie || process.cmdline.is_empty() {
            return false;
        }
        let cmdline = process.cmdline.join(" ");
        cmdline.contains(&self.image) && cmdline.contains(&self.instance_dir)
    }
}

/// Everything `status` reports about one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    pub base_dir: PathBuf,
    pub installation: InstallationState,
    pub run: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    pub log_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<InstanceRecord>,
}

impl InstanceStatus {
    /// One-line summary, e.g. `configured, running (pid 4242)`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.run {
            RunState::Stopped => format!("{}, stopped", self.installation.as_str()),
            RunState::Running { pid } => {
                format!("{}, running (pid {pid})", self.installation.as_str())
            }
        }
    }
}

/// Seconds between `start_time` and `now`, both Unix timestamps.
#[must_use]
pub fn uptime(start_time: u64, now: u64) -> Option<u64> {
    (start_time > 0).then(|| now.saturating_sub(start_time))
}

/// Format uptime seconds as human-readable string.
///
/// Returns "Xh Ym" if hours > 0, "Xm" if minutes > 0, otherwise "Xs".
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

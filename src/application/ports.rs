//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::domain::{
    InstanceLayout, InstanceRecord, PidRecord, ProcessSnapshot, RegistrationToken,
    RepositoryTarget, RunState, SupervisorConfig, TokenKind,
};

// ── Filesystem Ports ──────────────────────────────────────────────────────────

/// Abstracts the filesystem operations the installer and orchestrator need.
pub trait LocalFs {
    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;
    /// Create `path` and all parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Remove a directory tree.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// Atomically rename `from` to `to` (same filesystem).
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    /// Read a whole file as UTF-8 (lossy).
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Names of the subdirectories of `path`, sorted. Missing `path` → empty.
    fn list_dirs(&self, path: &Path) -> Result<Vec<String>>;
}

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Compute the SHA-256 hash of a file.
    fn sha256_file(&self, path: &Path) -> Result<String>;
}

// ── Artifact Port ─────────────────────────────────────────────────────────────

/// Fetch-and-unpack primitive for runner release archives.
#[allow(async_fn_in_trait)]
pub trait ArtifactSource {
    /// Download `url` into the file `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
    /// Unpack the archive at `archive` into the existing directory `into`.
    async fn unpack(&self, archive: &Path, into: &Path) -> Result<()>;
}

// ── Coordination Service Ports ────────────────────────────────────────────────

/// Issues short-lived registration and removal tokens.
#[allow(async_fn_in_trait)]
pub trait CoordinationService {
    /// Request a token of `kind` scoped to `target`.
    async fn issue_token(
        &self,
        target: &RepositoryTarget,
        kind: TokenKind,
    ) -> Result<RegistrationToken>;
}

/// Parameters for the runner's one-time configuration tool.
pub struct RegistrationRequest<'a> {
    /// URL the runner registers against.
    pub service_url: &'a str,
    /// Registration token.
    pub token: &'a RegistrationToken,
    /// Runner name as shown by the coordination service.
    pub name: &'a str,
    /// Labels, in order.
    pub labels: &'a [String],
    /// Work directory, relative to the runner directory or absolute.
    pub work_dir: &'a str,
    /// Replace an existing runner with the same name.
    pub replace: bool,
}

/// Runs the unpacked configuration tool.
#[allow(async_fn_in_trait)]
pub trait WorkerConfigurator {
    /// Register the runner; on success the tool writes the config marker.
    async fn register(&self, layout: &InstanceLayout, request: &RegistrationRequest<'_>)
    -> Result<()>;
    /// Remove the runner registration using a removal token.
    async fn unregister(&self, layout: &InstanceLayout, token: &RegistrationToken) -> Result<()>;
}

// ── Process Ports ─────────────────────────────────────────────────────────────

/// Read access to the OS process table.
pub trait ProcessTable {
    /// Snapshot of `pid`, or `None` if no such process exists.
    fn inspect(&self, pid: u32) -> Option<ProcessSnapshot>;
    /// Snapshot of every process except the caller.
    fn scan(&self) -> Vec<ProcessSnapshot>;
}

/// Termination signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Courteous request to exit (`SIGTERM`).
    Graceful,
    /// Non-ignorable termination (`SIGKILL`).
    Forceful,
}

/// Delivers termination signals.
pub trait ProcessSignaller {
    /// Send `signal` to `pid`. A process that is already gone is not an error.
    fn signal(&self, pid: u32, signal: Signal) -> Result<()>;
}

/// How to launch the worker.
pub struct LaunchSpec<'a> {
    /// Entry point to execute.
    pub program: &'a Path,
    /// Working directory of the worker.
    pub working_dir: &'a Path,
    /// File receiving stdout and stderr (appended).
    pub log_file: &'a Path,
}

/// Handle to a freshly launched worker, used only during start confirmation.
pub trait LaunchedWorker {
    /// OS process id.
    fn pid(&self) -> u32;
    /// Whether the process has already exited.
    fn has_exited(&mut self) -> Result<bool>;
}

/// Launches the worker as a detached background process.
pub trait WorkerLauncher {
    type Worker: LaunchedWorker;
    /// Launch in a new process group with stdin closed and output redirected.
    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<Self::Worker>;
}

// ── State Ports ───────────────────────────────────────────────────────────────

/// Persistence of the per-instance record and PID hint.
#[allow(async_fn_in_trait)]
pub trait InstanceStore {
    /// Load the setup record, `None` when absent.
    async fn load_record(&self, layout: &InstanceLayout) -> Result<Option<InstanceRecord>>;
    /// Persist the setup record.
    async fn save_record(&self, layout: &InstanceLayout, record: &InstanceRecord) -> Result<()>;
    /// Load the PID record. Missing, empty or corrupt files all read as `None`.
    async fn load_pid(&self, layout: &InstanceLayout) -> Option<PidRecord>;
    /// Persist the PID record atomically.
    async fn save_pid(&self, layout: &InstanceLayout, record: &PidRecord) -> Result<()>;
    /// Remove the PID record if present.
    async fn clear_pid(&self, layout: &InstanceLayout) -> Result<()>;
}

/// Serializes lifecycle operations per instance.
#[allow(async_fn_in_trait)]
pub trait InstanceLocker {
    /// Releases the lock on drop.
    type Guard;
    /// Acquire the instance lock, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Busy` when another holder keeps the lock past
    /// the timeout.
    async fn lock(&self, layout: &InstanceLayout, timeout: Duration) -> Result<Self::Guard>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts loading of the configuration file.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when the file is absent.
    fn load(&self) -> Result<SupervisorConfig>;
    /// Path of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

// ── Reporting Ports ───────────────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Receives every run state the orchestrator observes during a transition.
pub trait StateObserver {
    fn observe(&self, state: RunState);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn observe(&self, _: RunState) {}
}

// ── Composite ─────────────────────────────────────────────────────────────────

/// Composite trait: everything the lifecycle orchestrator needs from the host.
pub trait HostPorts:
    LocalFs
    + FileHasher
    + ArtifactSource
    + CoordinationService
    + WorkerConfigurator
    + ProcessTable
    + ProcessSignaller
    + WorkerLauncher
    + InstanceStore
    + InstanceLocker
{
}

/// Blanket implementation: any type implementing all sub-traits is a `HostPorts`.
impl<T> HostPorts for T where
    T: LocalFs
        + FileHasher
        + ArtifactSource
        + CoordinationService
        + WorkerConfigurator
        + ProcessTable
        + ProcessSignaller
        + WorkerLauncher
        + InstanceStore
        + InstanceLocker
{
}

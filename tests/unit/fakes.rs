//! In-memory host used by the lifecycle tests.
//!
//! `FakeHost` implements every port with a small simulated filesystem and
//! process table, and counts the calls that matter for idempotence checks.

#![allow(clippy::expect_used, dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use runnerctl::application::ports::{
    ArtifactSource, CoordinationService, FileHasher, InstanceLocker, InstanceStore, LaunchSpec,
    LaunchedWorker, LocalFs, ProcessSignaller, ProcessTable, ProgressReporter,
    RegistrationRequest, Signal, StateObserver, WorkerConfigurator, WorkerLauncher,
};
use runnerctl::domain::{
    InstanceLayout, InstanceRecord, PidRecord, ProcessSnapshot, RegistrationToken,
    RepositoryTarget, RunState, SupervisorConfig, SupervisorError, Timing, TokenKind,
};

pub const ROOT: &str = "/fake/root";

/// How the next launched worker behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Healthy,
    ExitsImmediately,
    SpawnFails,
    /// Stays alive but its command line is not the worker's.
    Unrecognised,
}

/// How a running process reacts to signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temper {
    Obedient,
    IgnoresTerm,
    Unkillable,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub fetches: usize,
    pub unpacks: usize,
    pub tokens: usize,
    pub registers: usize,
    pub unregisters: usize,
    pub launches: usize,
}

#[derive(Debug)]
struct FakeProcess {
    snapshot: ProcessSnapshot,
    temper: Temper,
}

pub struct Behaviour {
    pub launch: LaunchMode,
    pub temper: Temper,
    pub fetch_fails: bool,
    pub archive_complete: bool,
    pub digest: String,
    pub token_fails: bool,
    pub register_fails: bool,
    pub unregister_fails: bool,
    pub signal_fails: bool,
    pub busy: BTreeSet<String>,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            launch: LaunchMode::Healthy,
            temper: Temper::Obedient,
            fetch_fails: false,
            archive_complete: true,
            digest: "0".repeat(64),
            token_fails: false,
            register_fails: false,
            unregister_fails: false,
            signal_fails: false,
            busy: BTreeSet::new(),
        }
    }
}

#[derive(Default)]
struct World {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    processes: BTreeMap<u32, FakeProcess>,
    next_pid: u32,
    clock: u64,
    signals: Vec<(u32, Signal)>,
    calls: Calls,
}

pub struct FakeHost {
    world: Mutex<World>,
    pub behaviour: Mutex<Behaviour>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(World {
                next_pid: 1000,
                clock: 1_700_000_000,
                ..World::default()
            }),
            behaviour: Mutex::new(Behaviour::default()),
        }
    }

    pub fn with(self, f: impl FnOnce(&mut Behaviour)) -> Self {
        f(&mut self.behaviour.lock().expect("behaviour"));
        self
    }

    pub fn set(&self, f: impl FnOnce(&mut Behaviour)) {
        f(&mut self.behaviour.lock().expect("behaviour"));
    }

    pub fn calls(&self) -> Calls {
        self.world.lock().expect("world").calls
    }

    pub fn signals(&self) -> Vec<(u32, Signal)> {
        self.world.lock().expect("world").signals.clone()
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.world.lock().expect("world").files.contains_key(path)
    }

    pub fn write_file(&self, path: &Path, content: &str) {
        self.world
            .lock()
            .expect("world")
            .files
            .insert(path.to_path_buf(), content.to_string());
    }

    pub fn mkdir(&self, path: &Path) {
        self.world
            .lock()
            .expect("world")
            .dirs
            .insert(path.to_path_buf());
    }

    /// Lay down binaries and marker as a completed setup would.
    pub fn install_configured(&self, layout: &InstanceLayout) {
        self.mkdir(layout.base_dir());
        self.mkdir(&layout.runner_dir());
        self.write_file(&layout.config_tool(), "#!/bin/sh");
        self.write_file(&layout.run_entry(), "#!/bin/sh");
        self.write_file(&layout.config_marker(), "{}");
    }

    /// Add a process to the table and return its pid.
    pub fn spawn_process(&self, cmdline: &[&str], temper: Temper) -> u32 {
        let mut world = self.world.lock().expect("world");
        world.next_pid += 1;
        world.clock += 1;
        let pid = world.next_pid;
        let snapshot = ProcessSnapshot {
            pid,
            start_time: world.clock,
            cmdline: cmdline.iter().map(|s| (*s).to_string()).collect(),
            zombie: false,
        };
        world.processes.insert(pid, FakeProcess { snapshot, temper });
        pid
    }

    /// Add a worker process for `layout` to the table.
    pub fn spawn_worker(&self, layout: &InstanceLayout, temper: Temper) -> u32 {
        let entry = layout.run_entry().display().to_string();
        self.spawn_process(&["/bin/bash", &entry], temper)
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.world.lock().expect("world").processes.contains_key(&pid)
    }

    pub fn start_time(&self, pid: u32) -> u64 {
        self.world
            .lock()
            .expect("world")
            .processes
            .get(&pid)
            .map_or(0, |p| p.snapshot.start_time)
    }

    pub fn write_pid(&self, layout: &InstanceLayout, record: PidRecord) {
        self.write_file(
            &layout.pid_file(),
            &serde_json::to_string(&record).expect("pid json"),
        );
    }

    pub fn read_pid(&self, layout: &InstanceLayout) -> Option<PidRecord> {
        let world = self.world.lock().expect("world");
        world
            .files
            .get(&layout.pid_file())
            .and_then(|c| serde_json::from_str(c).ok())
    }
}

pub fn layout(name: &str) -> InstanceLayout {
    InstanceLayout::new(Path::new(ROOT), name).expect("valid name")
}

/// Config with every wait collapsed so tests never sleep for long.
pub fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        timing: Timing {
            start_confirm_ms: 0,
            stop_grace_secs: 0,
            stop_poll_ms: 10,
            kill_grace_ms: 0,
            restart_settle_ms: 0,
            lock_timeout_secs: 0,
            config_tool_timeout_secs: 1,
        },
        ..SupervisorConfig::default()
    }
}

pub fn sample_record(name: &str, repo: &str) -> InstanceRecord {
    InstanceRecord {
        name: name.to_string(),
        repository: repo.parse::<RepositoryTarget>().expect("target"),
        labels: vec!["self-hosted".to_string()],
        work_dir: "_work".to_string(),
        runner_version: "2.321.0".to_string(),
        created_at: Utc::now(),
    }
}

fn under(path: &Path, prefix: &Path) -> bool {
    path.starts_with(prefix)
}

// ── Filesystem ────────────────────────────────────────────────────────────────

impl LocalFs for FakeHost {
    fn exists(&self, path: &Path) -> bool {
        let world = self.world.lock().expect("world");
        world.files.contains_key(path) || world.dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.mkdir(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut world = self.world.lock().expect("world");
        world.files.retain(|p, _| !under(p, path));
        world.dirs.retain(|p| !under(p, path));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let removed = self.world.lock().expect("world").files.remove(path);
        anyhow::ensure!(removed.is_some(), "no such file {}", path.display());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut world = self.world.lock().expect("world");
        let moved_files: Vec<(PathBuf, String)> = world
            .files
            .iter()
            .filter(|(p, _)| under(p, from))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        let moved_dirs: Vec<PathBuf> = world
            .dirs
            .iter()
            .filter(|p| under(p, from))
            .cloned()
            .collect();
        for (path, content) in moved_files {
            world.files.remove(&path);
            let rel = path.strip_prefix(from).expect("prefix");
            world.files.insert(to.join(rel), content);
        }
        for path in moved_dirs {
            world.dirs.remove(&path);
            let rel = path.strip_prefix(from).expect("prefix");
            world.dirs.insert(to.join(rel));
        }
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.world
            .lock()
            .expect("world")
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file {}", path.display()))
    }

    fn list_dirs(&self, path: &Path) -> Result<Vec<String>> {
        let world = self.world.lock().expect("world");
        let names: BTreeSet<String> = world
            .dirs
            .iter()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        Ok(names.into_iter().collect())
    }
}

impl FileHasher for FakeHost {
    fn sha256_file(&self, _path: &Path) -> Result<String> {
        Ok(self.behaviour.lock().expect("behaviour").digest.clone())
    }
}

impl ArtifactSource for FakeHost {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.world.lock().expect("world").calls.fetches += 1;
        if self.behaviour.lock().expect("behaviour").fetch_fails {
            anyhow::bail!("server returned HTTP 404 for {url}");
        }
        self.write_file(dest, "archive");
        Ok(())
    }

    async fn unpack(&self, _archive: &Path, into: &Path) -> Result<()> {
        self.world.lock().expect("world").calls.unpacks += 1;
        self.write_file(&into.join("config.sh"), "#!/bin/sh");
        if self.behaviour.lock().expect("behaviour").archive_complete {
            self.write_file(&into.join("run.sh"), "#!/bin/sh");
        }
        Ok(())
    }
}

// ── Coordination ──────────────────────────────────────────────────────────────

impl CoordinationService for FakeHost {
    async fn issue_token(
        &self,
        _target: &RepositoryTarget,
        kind: TokenKind,
    ) -> Result<RegistrationToken> {
        self.world.lock().expect("world").calls.tokens += 1;
        if self.behaviour.lock().expect("behaviour").token_fails {
            anyhow::bail!("API token was rejected (HTTP 401)");
        }
        Ok(RegistrationToken::new(&format!("ISSUED-{kind:?}")).expect("token"))
    }
}

impl WorkerConfigurator for FakeHost {
    async fn register(
        &self,
        layout: &InstanceLayout,
        _request: &RegistrationRequest<'_>,
    ) -> Result<()> {
        self.world.lock().expect("world").calls.registers += 1;
        if self.behaviour.lock().expect("behaviour").register_fails {
            anyhow::bail!("config.sh exited with exit status: 1: Http response code: NotFound");
        }
        self.write_file(&layout.config_marker(), "{}");
        Ok(())
    }

    async fn unregister(&self, layout: &InstanceLayout, _token: &RegistrationToken) -> Result<()> {
        self.world.lock().expect("world").calls.unregisters += 1;
        if self.behaviour.lock().expect("behaviour").unregister_fails {
            anyhow::bail!("config.sh remove exited with exit status: 1");
        }
        self.world
            .lock()
            .expect("world")
            .files
            .remove(&layout.config_marker());
        Ok(())
    }
}

// ── Processes ─────────────────────────────────────────────────────────────────

impl ProcessTable for FakeHost {
    fn inspect(&self, pid: u32) -> Option<ProcessSnapshot> {
        self.world
            .lock()
            .expect("world")
            .processes
            .get(&pid)
            .map(|p| p.snapshot.clone())
    }

    fn scan(&self) -> Vec<ProcessSnapshot> {
        self.world
            .lock()
            .expect("world")
            .processes
            .values()
            .map(|p| p.snapshot.clone())
            .collect()
    }
}

impl ProcessSignaller for FakeHost {
    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        if self.behaviour.lock().expect("behaviour").signal_fails {
            anyhow::bail!("sending signal to pid {pid}: EPERM: Operation not permitted");
        }
        let mut world = self.world.lock().expect("world");
        world.signals.push((pid, signal));
        let dies = match world.processes.get(&pid).map(|p| p.temper) {
            None => return Ok(()),
            Some(Temper::Obedient) => true,
            Some(Temper::IgnoresTerm) => signal == Signal::Forceful,
            Some(Temper::Unkillable) => false,
        };
        if dies {
            world.processes.remove(&pid);
        }
        Ok(())
    }
}

pub struct FakeWorker {
    pid: u32,
    exited: bool,
}

impl LaunchedWorker for FakeWorker {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.exited)
    }
}

impl WorkerLauncher for FakeHost {
    type Worker = FakeWorker;

    fn launch(&self, spec: &LaunchSpec<'_>) -> Result<FakeWorker> {
        self.world.lock().expect("world").calls.launches += 1;
        let (mode, temper) = {
            let b = self.behaviour.lock().expect("behaviour");
            (b.launch, b.temper)
        };
        let entry = spec.program.display().to_string();
        match mode {
            LaunchMode::SpawnFails => anyhow::bail!("failed to spawn {entry}"),
            LaunchMode::ExitsImmediately => {
                let mut world = self.world.lock().expect("world");
                world.next_pid += 1;
                Ok(FakeWorker {
                    pid: world.next_pid,
                    exited: true,
                })
            }
            LaunchMode::Unrecognised => {
                let pid = self.spawn_process(&["/usr/bin/sleep", "1000"], temper);
                Ok(FakeWorker { pid, exited: false })
            }
            LaunchMode::Healthy => {
                let pid = self.spawn_process(&["/bin/bash", &entry], temper);
                Ok(FakeWorker { pid, exited: false })
            }
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

impl InstanceStore for FakeHost {
    async fn load_record(&self, layout: &InstanceLayout) -> Result<Option<InstanceRecord>> {
        let content = self
            .world
            .lock()
            .expect("world")
            .files
            .get(&layout.record_file())
            .cloned();
        content
            .map(|c| serde_json::from_str(&c).map_err(anyhow::Error::from))
            .transpose()
    }

    async fn save_record(&self, layout: &InstanceLayout, record: &InstanceRecord) -> Result<()> {
        self.write_file(&layout.record_file(), &serde_json::to_string(record)?);
        Ok(())
    }

    async fn load_pid(&self, layout: &InstanceLayout) -> Option<PidRecord> {
        self.read_pid(layout)
    }

    async fn save_pid(&self, layout: &InstanceLayout, record: &PidRecord) -> Result<()> {
        self.write_pid(layout, *record);
        Ok(())
    }

    async fn clear_pid(&self, layout: &InstanceLayout) -> Result<()> {
        self.world
            .lock()
            .expect("world")
            .files
            .remove(&layout.pid_file());
        Ok(())
    }
}

impl InstanceLocker for FakeHost {
    type Guard = ();

    async fn lock(&self, layout: &InstanceLayout, _timeout: Duration) -> Result<()> {
        if self
            .behaviour
            .lock()
            .expect("behaviour")
            .busy
            .contains(layout.name())
        {
            return Err(SupervisorError::Busy(layout.name().to_string()).into());
        }
        Ok(())
    }
}

// ── Reporting ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub warnings: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, _message: &str) {}

    fn success(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .expect("warnings")
            .push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<RunState>>,
}

impl StateObserver for RecordingObserver {
    fn observe(&self, state: RunState) {
        self.states.lock().expect("states").push(state);
    }
}

//! Domain types and validators for runnerctl configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::instance::validate_runner_version;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_RUNNER_VERSION: &str = "2.321.0";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com/actions/runner/releases/download";
pub const DEFAULT_SERVICE_URL: &str = "https://github.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_WORKER_SIGNATURE: &str = "run.sh";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.runnerctl/config.yaml`.
///
/// Built once at the CLI boundary and handed to every component by
/// reference; nothing below the CLI reads the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Directory holding `runners/` and `locks/`. `None` means `~/.runnerctl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
    /// Runner release installed when `setup` gets no explicit version.
    pub runner_version: String,
    /// Base URL of the release download area.
    pub download_base_url: String,
    /// Web URL runners register against.
    pub service_url: String,
    /// REST API base used to issue registration/removal tokens.
    pub api_base_url: String,
    /// Substring every worker command line contains.
    pub worker_signature: String,
    /// Waits and polling intervals.
    pub timing: Timing,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            runner_version: DEFAULT_RUNNER_VERSION.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            worker_signature: DEFAULT_WORKER_SIGNATURE.to_string(),
            timing: Timing::default(),
        }
    }
}

/// Bounded waits used by start confirmation and stop escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// How long a freshly launched worker must stay alive.
    pub start_confirm_ms: u64,
    /// Wait after the graceful signal before escalating.
    pub stop_grace_secs: u64,
    /// Poll interval while waiting for the worker to exit.
    pub stop_poll_ms: u64,
    /// Wait after the forceful signal before giving up.
    pub kill_grace_ms: u64,
    /// Pause between stop and start during restart.
    pub restart_settle_ms: u64,
    /// How long to wait for another invocation to release the instance lock.
    pub lock_timeout_secs: u64,
    /// Upper bound for one run of the configuration tool.
    pub config_tool_timeout_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            start_confirm_ms: 3000,
            stop_grace_secs: 10,
            stop_poll_ms: 250,
            kill_grace_ms: 3000,
            restart_settle_ms: 1000,
            lock_timeout_secs: 30,
            config_tool_timeout_secs: 300,
        }
    }
}

impl Timing {
    #[must_use]
    pub fn start_confirm(&self) -> Duration {
        Duration::from_millis(self.start_confirm_ms)
    }

    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    /// Never zero, so polling loops always yield.
    #[must_use]
    pub fn stop_poll(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms.max(10))
    }

    #[must_use]
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    #[must_use]
    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    #[must_use]
    pub fn config_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.config_tool_timeout_secs)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns an error naming the first invalid key.
pub fn validate_config(config: &SupervisorConfig) -> Result<()> {
    if validate_runner_version(&config.runner_version).is_err() {
        return Err(invalid(
            "runner_version",
            &config.runner_version,
            "Expected a semantic version such as 2.321.0",
        ));
    }
    for (key, value) in [
        ("download_base_url", &config.download_base_url),
        ("service_url", &config.service_url),
        ("api_base_url", &config.api_base_url),
    ] {
        if !(value.starts_with("https://") || value.starts_with("http://")) {
            return Err(invalid(key, value, "Expected an http(s) URL"));
        }
    }
    if config.worker_signature.trim().is_empty() {
        return Err(invalid(
            "worker_signature",
            &config.worker_signature,
            "Must not be empty",
        ));
    }
    if let Some(root) = &config.root_dir
        && !root.is_absolute()
    {
        return Err(invalid(
            "root_dir",
            &root.display().to_string(),
            "Must be an absolute path",
        ));
    }
    Ok(())
}

fn invalid(key: &str, value: &str, hint: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
    .into()
}

// ── Unit tests ───────────────────────────────────────────────────────────────

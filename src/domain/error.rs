//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Supervisor errors ─────────────────────────────────────────────────────────

/// Failures surfaced by the lifecycle commands.
///
/// Each variant implies a different remediation, so the CLI maps them to
/// distinct exit codes instead of collapsing them into a generic failure.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Unsupported platform: {os}/{arch}. Runners are available for linux and macOS on x64, arm64 and arm.")]
    PlatformUnsupported { os: String, arch: String },

    #[error("Install failed: {0}\n\nRe-run 'runnerctl setup' to retry.")]
    Install(String),

    #[error("Configuration failed: {0}")]
    Config(String),

    #[error("Runner failed to start or exited right after launch. Check the log: {}", log.display())]
    Start { log: PathBuf },

    #[error(
        "Runner (pid {pid}) could not be stopped. Operator intervention required."
    )]
    Stop { pid: u32 },

    #[error("Another operation on '{0}' is in progress. Try again later.")]
    Busy(String),
}

impl SupervisorError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PlatformUnsupported { .. } => 2,
            Self::Install(_) => 3,
            Self::Config(_) => 4,
            Self::Start { .. } => 5,
            Self::Stop { .. } => 6,
            Self::Busy(_) => 7,
        }
    }

    /// Stable machine-readable code used by `--json` error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlatformUnsupported { .. } => "platform_unsupported",
            Self::Install(_) => "install_failed",
            Self::Config(_) => "config_failed",
            Self::Start { .. } => "start_failed",
            Self::Stop { .. } => "stop_failed",
            Self::Busy(_) => "busy",
        }
    }
}

/// Find the first `SupervisorError` in an error chain, through any context.
#[must_use]
pub fn find_supervisor_error(err: &anyhow::Error) -> Option<&SupervisorError> {
    // A `SupervisorError` attached with `.context(..)` is only visible to
    // `anyhow::Error::downcast_ref`, not to the chain's `dyn Error` links.
    err.downcast_ref::<SupervisorError>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<SupervisorError>()))
}

// ── Instance errors ───────────────────────────────────────────────────────────

/// Errors related to instance identity and parameters.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("Invalid runner name '{0}': must match ^[A-Za-z0-9][A-Za-z0-9._-]{{0,62}}$")]
    InvalidName(String),

    #[error("Invalid repository target '{0}': expected owner/repo, org, or a URL")]
    InvalidTarget(String),

    #[error("Invalid runner version '{0}': expected a semantic version such as 2.321.0")]
    InvalidVersion(String),

    #[error("Invalid SHA-256 digest '{0}': expected 64 hex characters")]
    InvalidDigest(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\n{hint}")]
    InvalidValue {
        key: String,
        value: String,
        hint: String,
    },
}

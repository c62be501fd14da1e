//! Instance identity, on-disk layout, and persisted setup parameters.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

#![allow(clippy::expect_used)] // Regex patterns are compile-time constants

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::InstanceError;

/// Valid instance names: alphanumeric start, then up to 62 of `[A-Za-z0-9._-]`.
pub static INSTANCE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,62}$").expect("valid regex")
});

static SHA256_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("valid regex"));

/// File written by the runner's configuration tool on successful registration.
pub const CONFIG_MARKER: &str = ".runner";

/// Files that must be present for a binary set to count as installed.
pub const REQUIRED_ENTRIES: &[&str] = &["config.sh", "run.sh"];

/// Validates an instance name.
///
/// Names become directory components, so path separators and leading dots
/// are rejected.
///
/// # Errors
///
/// Returns an error if the name doesn't match [`INSTANCE_NAME_RE`].
pub fn validate_instance_name(name: &str) -> Result<()> {
    if !INSTANCE_NAME_RE.is_match(name) {
        return Err(InstanceError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// Validates a runner version string.
///
/// # Errors
///
/// Returns an error if the version (with an optional leading `v`) is not semver.
pub fn validate_runner_version(version: &str) -> Result<String> {
    let trimmed = version.trim().trim_start_matches('v');
    semver::Version::parse(trimmed)
        .map(|v| v.to_string())
        .map_err(|_| InstanceError::InvalidVersion(version.to_string()).into())
}

/// Validates an expected archive digest, returning it lowercased.
///
/// # Errors
///
/// Returns an error if the digest is not 64 hex characters.
pub fn validate_sha256(digest: &str) -> Result<String> {
    if !SHA256_RE.is_match(digest) {
        return Err(InstanceError::InvalidDigest(digest.to_string()).into());
    }
    Ok(digest.to_ascii_lowercase())
}

// ── Repository target ─────────────────────────────────────────────────────────

/// Where a runner registers: a single repository or a whole organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RepositoryTarget {
    Repo { owner: String, repo: String },
    Org { org: String },
}

/// Which short-lived token to request from the coordination service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Registration,
    Removal,
}

impl TokenKind {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Registration => "registration-token",
            Self::Removal => "remove-token",
        }
    }
}

impl RepositoryTarget {
    /// URL the runner registers against, e.g. `https://github.com/owner/repo`.
    #[must_use]
    pub fn service_url(&self, service_base: &str) -> String {
        format!("{}/{self}", service_base.trim_end_matches('/'))
    }

    /// REST endpoint that issues a token of `kind` for this target.
    #[must_use]
    pub fn token_endpoint(&self, api_base: &str, kind: TokenKind) -> String {
        let api = api_base.trim_end_matches('/');
        match self {
            Self::Repo { owner, repo } => {
                format!("{api}/repos/{owner}/{repo}/actions/runners/{}", kind.endpoint())
            }
            Self::Org { org } => format!("{api}/orgs/{org}/actions/runners/{}", kind.endpoint()),
        }
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repo { owner, repo } => write!(f, "{owner}/{repo}"),
            Self::Org { org } => write!(f, "{org}"),
        }
    }
}

impl FromStr for RepositoryTarget {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InstanceError::InvalidTarget(s.to_string());
        let trimmed = s.trim();
        // Drop scheme and host from URLs, keep the path.
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map_or("", |(_, p)| p),
            None => trimmed,
        };
        let segments: Vec<&str> = path
            .trim_end_matches(".git")
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect();
        let valid_segment = |seg: &str| {
            seg.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                && !seg.starts_with('.')
        };
        if segments.iter().any(|seg| !valid_segment(seg)) {
            return Err(invalid());
        }
        match segments.as_slice() {
            [org] => Ok(Self::Org {
                org: (*org).to_string(),
            }),
            [owner, repo] => Ok(Self::Repo {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for RepositoryTarget {
    type Error = InstanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryTarget> for String {
    fn from(value: RepositoryTarget) -> Self {
        value.to_string()
    }
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Paths of one instance, derived from `(root, name)` only.
///
/// Renaming an instance means creating a new layout; a layout never moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    name: String,
    base: PathBuf,
    lock: PathBuf,
}

impl InstanceLayout {
    /// Derive the layout for `name` under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid instance name.
    pub fn new(root: &Path, name: &str) -> Result<Self> {
        validate_instance_name(name)?;
        Ok(Self {
            name: name.to_string(),
            base: runners_dir(root).join(name),
            lock: root.join("locks").join(format!("{name}.lock")),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base directory owning everything that belongs to this instance.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Promoted binary set.
    #[must_use]
    pub fn runner_dir(&self) -> PathBuf {
        self.base.join("runner")
    }

    /// Staging directory an archive is unpacked into before promotion.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.base.join(".staging")
    }

    /// Temporary location of the downloaded archive.
    #[must_use]
    pub fn download_path(&self) -> PathBuf {
        self.base.join(".download.tar.gz")
    }

    #[must_use]
    pub fn config_tool(&self) -> PathBuf {
        self.runner_dir().join("config.sh")
    }

    #[must_use]
    pub fn run_entry(&self) -> PathBuf {
        self.runner_dir().join("run.sh")
    }

    #[must_use]
    pub fn config_marker(&self) -> PathBuf {
        self.runner_dir().join(CONFIG_MARKER)
    }

    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.base.join("runner.pid")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.base.join("runner.log")
    }

    #[must_use]
    pub fn record_file(&self) -> PathBuf {
        self.base.join("instance.json")
    }

    /// Advisory lock file. Lives outside the base directory so `uninstall`
    /// can remove the tree while still holding the lock.
    #[must_use]
    pub fn lock_file(&self) -> &Path {
        &self.lock
    }

    /// Default work directory handed to the runner, relative to `runner/`.
    #[must_use]
    pub fn default_work_dir() -> &'static str {
        "_work"
    }
}

/// Directory holding one base directory per instance.
#[must_use]
pub fn runners_dir(root: &Path) -> PathBuf {
    root.join("runners")
}

// ── Persisted record ──────────────────────────────────────────────────────────

/// Setup parameters persisted to `<base>/instance.json`.
///
/// Purely informational for `start`, `status` and `list`; `uninstall` reads
/// the repository target from it to de-register the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    pub repository: RepositoryTarget,
    #[serde(default)]
    pub labels: Vec<String>,
    pub work_dir: String,
    pub runner_version: String,
    pub created_at: DateTime<Utc>,
}

//! Runner installation: download, verify, unpack into staging, promote.
//!
//! The runner directory is either fully populated or absent. All work
//! happens in a staging directory that is renamed into place only after the
//! archive has been verified and unpacked completely.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{ArtifactSource, FileHasher, LocalFs, ProgressReporter};
use crate::domain::instance::REQUIRED_ENTRIES;
use crate::domain::platform::artifact_url;
use crate::domain::{InstallationState, InstanceLayout, Platform, SupervisorConfig, SupervisorError};

/// Which release to install.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactRequest<'a> {
    pub platform: Platform,
    pub version: &'a str,
    /// Expected SHA-256 of the archive, lowercase hex.
    pub sha256: Option<&'a str>,
}

/// Result of [`install`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InstallOutcome {
    AlreadyInstalled,
    Installed { version: String },
}

impl InstallOutcome {
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::AlreadyInstalled => "runner binaries already installed".to_string(),
            Self::Installed { version } => format!("installed runner {version}"),
        }
    }
}

/// Whether every required entry exists in the runner directory.
pub fn binaries_present(fs: &impl LocalFs, layout: &InstanceLayout) -> bool {
    let dir = layout.runner_dir();
    REQUIRED_ENTRIES.iter().all(|entry| fs.exists(&dir.join(entry)))
}

/// Derive the installation state from the filesystem.
pub fn installation_state(fs: &impl LocalFs, layout: &InstanceLayout) -> InstallationState {
    InstallationState::derive(
        binaries_present(fs, layout),
        fs.exists(&layout.config_marker()),
    )
}

/// Install the runner binaries unless they are already present.
///
/// # Errors
///
/// Returns `SupervisorError::Install` if the download, checksum
/// verification, unpacking or promotion fails. Partial output is removed.
pub async fn install(
    fs: &(impl LocalFs + FileHasher),
    source: &impl ArtifactSource,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    request: &ArtifactRequest<'_>,
    reporter: &impl ProgressReporter,
) -> Result<InstallOutcome> {
    if binaries_present(fs, layout) {
        tracing::debug!(instance = layout.name(), "runner binaries present, skipping download");
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    let result = stage_and_promote(fs, source, config, layout, request, reporter).await;
    discard_leftovers(fs, layout);

    result.map_err(|e| SupervisorError::Install(format!("{e:#}")))?;
    Ok(InstallOutcome::Installed {
        version: request.version.to_string(),
    })
}

async fn stage_and_promote(
    fs: &(impl LocalFs + FileHasher),
    source: &impl ArtifactSource,
    config: &SupervisorConfig,
    layout: &InstanceLayout,
    request: &ArtifactRequest<'_>,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let runner_dir = layout.runner_dir();
    let staging = layout.staging_dir();
    let archive = layout.download_path();

    fs.create_dir_all(layout.base_dir())
        .with_context(|| format!("creating {}", layout.base_dir().display()))?;
    discard_leftovers(fs, layout);
    if fs.exists(&runner_dir) {
        tracing::warn!(path = %runner_dir.display(), "removing incomplete runner directory");
        fs.remove_dir_all(&runner_dir)
            .with_context(|| format!("removing {}", runner_dir.display()))?;
    }

    let url = artifact_url(&config.download_base_url, request.platform, request.version);
    reporter.step(&format!(
        "downloading runner {} for {}...",
        request.version, request.platform
    ));
    tracing::info!(%url, "downloading runner archive");
    source
        .fetch(&url, &archive)
        .await
        .with_context(|| format!("downloading {url}"))?;

    if let Some(expected) = request.sha256 {
        let actual = fs.sha256_file(&archive).context("hashing downloaded archive")?;
        anyhow::ensure!(
            actual == expected,
            "checksum mismatch for {url}: expected {expected}, got {actual}"
        );
    }

    reporter.step("unpacking runner...");
    fs.create_dir_all(&staging)
        .with_context(|| format!("creating {}", staging.display()))?;
    source
        .unpack(&archive, &staging)
        .await
        .context("unpacking runner archive")?;
    ensure_complete(fs, &staging)?;

    fs.rename(&staging, &runner_dir)
        .with_context(|| format!("moving staged runner into {}", runner_dir.display()))?;
    Ok(())
}

fn ensure_complete(fs: &impl LocalFs, staging: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !fs.exists(&staging.join(entry)))
        .collect();
    anyhow::ensure!(
        missing.is_empty(),
        "archive is missing required entries: {}",
        missing.join(", ")
    );
    Ok(())
}

/// Best-effort removal of the staging directory and downloaded archive.
fn discard_leftovers(fs: &impl LocalFs, layout: &InstanceLayout) {
    let staging = layout.staging_dir();
    if fs.exists(&staging)
        && let Err(e) = fs.remove_dir_all(&staging)
    {
        tracing::warn!(path = %staging.display(), error = %e, "could not remove staging directory");
    }
    let archive = layout.download_path();
    if fs.exists(&archive)
        && let Err(e) = fs.remove_file(&archive)
    {
        tracing::warn!(path = %archive.display(), error = %e, "could not remove downloaded archive");
    }
}

//! Host platform detection and artifact naming.
//!
//! Pure functions only. `detect()` reads the compile-time target constants,
//! everything else takes data in and returns data out.

use serde::Serialize;

use crate::domain::error::SupervisorError;

/// Operating system family a runner artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    MacOs,
}

impl OsFamily {
    /// Token used in artifact file names.
    #[must_use]
    pub fn artifact_token(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "osx",
        }
    }

    /// Default runner label for this OS.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
        }
    }
}

/// CPU architecture, normalized across naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
    Arm,
}

impl Arch {
    #[must_use]
    pub fn artifact_token(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::X64 => "X64",
            Self::Arm64 => "ARM64",
            Self::Arm => "ARM",
        }
    }
}

/// Resolved `(os, arch)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: Arch,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os.artifact_token(), self.arch.artifact_token())
    }
}

/// Detect the platform this binary was built for.
///
/// # Errors
///
/// Returns `SupervisorError::PlatformUnsupported` when no runner artifact
/// exists for the host.
pub fn detect() -> Result<Platform, SupervisorError> {
    detect_from(std::env::consts::OS, std::env::consts::ARCH)
}

/// Resolve raw OS/architecture names into a [`Platform`].
///
/// # Errors
///
/// Returns `SupervisorError::PlatformUnsupported` for unknown names.
pub fn detect_from(os: &str, arch: &str) -> Result<Platform, SupervisorError> {
    let unsupported = || SupervisorError::PlatformUnsupported {
        os: os.to_string(),
        arch: arch.to_string(),
    };
    let os_family = normalize_os(os).ok_or_else(unsupported)?;
    let arch = normalize_arch(arch).ok_or_else(unsupported)?;
    Ok(Platform {
        os: os_family,
        arch,
    })
}

fn normalize_os(os: &str) -> Option<OsFamily> {
    match os.to_ascii_lowercase().as_str() {
        "linux" => Some(OsFamily::Linux),
        "macos" | "darwin" | "osx" => Some(OsFamily::MacOs),
        _ => None,
    }
}

fn normalize_arch(arch: &str) -> Option<Arch> {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => Some(Arch::X64),
        "aarch64" | "arm64" => Some(Arch::Arm64),
        "arm" | "armv7" | "armv7l" | "armhf" => Some(Arch::Arm),
        _ => None,
    }
}

/// Build the download URL of the runner archive for `platform` and `version`.
///
/// Layout: `<base>/v<version>/actions-runner-<os>-<arch>-<version>.tar.gz`.
#[must_use]
pub fn artifact_url(base: &str, platform: Platform, version: &str) -> String {
    format!(
        "{}/v{version}/actions-runner-{}-{}-{version}.tar.gz",
        base.trim_end_matches('/'),
        platform.os.artifact_token(),
        platform.arch.artifact_token(),
    )
}

/// Default labels for a runner on `platform`, followed by `extra` labels.
///
/// Duplicates are dropped case-insensitively, keeping the first spelling.
#[must_use]
pub fn default_labels(platform: Platform, extra: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let candidates = ["self-hosted", platform.os.label(), platform.arch.label()]
        .into_iter()
        .map(str::to_string)
        .chain(extra.iter().map(|l| l.trim().to_string()));
    for label in candidates {
        if label.is_empty() || labels.iter().any(|l| l.eq_ignore_ascii_case(&label)) {
            continue;
        }
        labels.push(label);
    }
    labels
}

//! Infrastructure implementation of the `InstanceStore` port.
//!
//! Records are written with an atomic write (temp file + rename) so a reader
//! never sees a half-written file. Blocking I/O runs on
//! `tokio::task::spawn_blocking`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::InstanceStore;
use crate::domain::{InstanceLayout, InstanceRecord, PidRecord};
use crate::infra::SystemHost;

impl InstanceStore for SystemHost {
    async fn load_record(&self, layout: &InstanceLayout) -> Result<Option<InstanceRecord>> {
        let path = layout.record_file();
        tokio::task::spawn_blocking(move || load_json(&path))
            .await
            .context("record load task panicked")?
    }

    async fn save_record(&self, layout: &InstanceLayout, record: &InstanceRecord) -> Result<()> {
        let path = layout.record_file();
        let record = record.clone();
        tokio::task::spawn_blocking(move || write_json_atomic(&path, &record))
            .await
            .context("record save task panicked")?
    }

    async fn load_pid(&self, layout: &InstanceLayout) -> Option<PidRecord> {
        let path = layout.pid_file();
        let loaded = tokio::task::spawn_blocking(move || read_pid_file(&path)).await;
        match loaded {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable pid file");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "pid load task panicked");
                None
            }
        }
    }

    async fn save_pid(&self, layout: &InstanceLayout, record: &PidRecord) -> Result<()> {
        let path = layout.pid_file();
        let record = *record;
        tokio::task::spawn_blocking(move || write_json_atomic(&path, &record))
            .await
            .context("pid save task panicked")?
    }

    async fn clear_pid(&self, layout: &InstanceLayout) -> Result<()> {
        let path = layout.pid_file();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing pid file {}", path.display())),
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(value))
}

/// Empty and missing files both read as no record. A bare integer is
/// accepted as a pid with unknown start time.
fn read_pid_file(path: &Path) -> Result<Option<PidRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(pid) = trimmed.parse::<u32>() {
        return Ok(Some(PidRecord { pid, start_time: 0 }));
    }
    let record: PidRecord =
        serde_json::from_str(trimmed).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(record))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value).context("serializing record")?;

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, &content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
    }

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

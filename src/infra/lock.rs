//! Infrastructure implementation of the `InstanceLocker` port.
//!
//! One advisory lock file per instance under `<root>/locks/`, outside the
//! instance directory so `uninstall` can delete that directory while holding
//! the lock. The OS releases the lock if the holder dies.

use std::fs::{File, OpenOptions};
use std::time::Duration;

use anyhow::{Context, Result};
use fs2::FileExt;
use tokio::time::{Instant, sleep};

use crate::application::ports::InstanceLocker;
use crate::domain::{InstanceLayout, SupervisorError};
use crate::infra::SystemHost;

const LOCK_POLL: Duration = Duration::from_millis(100);

/// Held for the duration of one lifecycle operation.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(error = %e, "releasing instance lock");
        }
    }
}

impl InstanceLocker for SystemHost {
    type Guard = InstanceLock;

    async fn lock(&self, layout: &InstanceLayout, timeout: Duration) -> Result<InstanceLock> {
        let path = layout.lock_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("opening lock file {}", path.display()))?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(InstanceLock { file }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("locking {}", path.display()));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SupervisorError::Busy(layout.name().to_string()).into());
            }
            tracing::debug!(instance = layout.name(), "waiting for instance lock");
            sleep(LOCK_POLL.min(deadline - now)).await;
        }
    }
}

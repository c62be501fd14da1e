//! Bounded execution of the runner's helper scripts.
//!
//! `TokioCommandRunner` uses tokio for async process execution with a
//! guaranteed timeout: on expiry the child is killed explicitly rather than
//! left running behind a dropped future.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Runs short-lived commands with captured output.
#[derive(Debug, Clone, Copy)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `program` with `args` in `dir`, with `envs` added to the
    /// inherited environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exceeds the
    /// timeout.
    pub async fn run_in(
        &self,
        dir: &Path,
        program: &Path,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", program.display()))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {}", program.display()))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{} timed out after {}s", program.display(), self.timeout.as_secs())
            }
        }
    }
}

/// Last few lines of a command's output, stderr preferred, for error messages.
#[must_use]
pub fn output_tail(output: &Output, lines: usize) -> String {
    let text = if output.stderr.iter().any(|b| !b.is_ascii_whitespace()) {
        String::from_utf8_lossy(&output.stderr)
    } else {
        String::from_utf8_lossy(&output.stdout)
    };
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

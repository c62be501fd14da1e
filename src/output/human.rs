//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;

use crate::application::services::lifecycle::{SetupOutcome, Transition, UninstallOutcome};
use crate::application::services::supervisor::{RestartOutcome, StartOutcome, StopOutcome};
use crate::domain::state::format_uptime;
use crate::domain::{InstanceStatus, RunState, SupervisorConfig};
use crate::output::OutputContext;

/// One-line descriptions of what an operation did.
pub trait Summarize {
    fn summary_lines(&self) -> Vec<String>;
}

impl Summarize for StartOutcome {
    fn summary_lines(&self) -> Vec<String> {
        vec![self.summary()]
    }
}

impl Summarize for StopOutcome {
    fn summary_lines(&self) -> Vec<String> {
        vec![self.summary()]
    }
}

impl Summarize for RestartOutcome {
    fn summary_lines(&self) -> Vec<String> {
        vec![self.stop.summary(), self.start.summary()]
    }
}

impl Summarize for SetupOutcome {
    fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("platform {}", self.platform),
            self.install.summary(),
            self.configure.summary().to_string(),
            self.start.summary(),
        ]
    }
}

impl Summarize for UninstallOutcome {
    fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(stop) = self.stop {
            lines.push(stop.summary());
        }
        if self.deregistered {
            lines.push("registration removed".to_string());
        }
        lines.push(if self.removed {
            "runner files removed".to_string()
        } else {
            "nothing to remove".to_string()
        });
        lines
    }
}

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the outcome of a lifecycle operation with its before/after states.
    pub fn render_transition<O: Summarize>(&self, transition: &Transition<O>) {
        for line in transition.outcome.summary_lines() {
            self.ctx.success(&line);
        }
        self.ctx.kv("before:", &transition.before.summary());
        self.ctx.kv("after: ", &transition.after.summary());
    }

    /// Render the status of one instance.
    pub fn render_status(&self, status: &InstanceStatus) {
        self.ctx.header(&status.name);
        self.ctx.kv("state:     ", &status.summary());
        if let Some(uptime) = status.uptime_seconds {
            self.ctx.kv("uptime:    ", &format_uptime(uptime));
        }
        if let Some(record) = &status.record {
            self.ctx.kv("repository:", &record.repository.to_string());
            self.ctx.kv("labels:    ", &record.labels.join(", "));
            self.ctx.kv("version:   ", &record.runner_version);
        }
        self.ctx
            .kv("directory: ", &status.base_dir.display().to_string());
        self.ctx.kv("log:       ", &status.log_file.display().to_string());
    }

    /// Render every instance as a table.
    pub fn render_list(&self, statuses: &[InstanceStatus]) {
        if statuses.is_empty() {
            self.ctx
                .info("No runners set up. Create one: runnerctl setup <name> --repo <owner/repo>");
            return;
        }
        if self.ctx.quiet {
            return;
        }
        println!(
            "  {}",
            format!("{:<24} {:<14} {:<8} {:<8} {}", "NAME", "INSTALL", "STATE", "PID", "REPOSITORY")
                .style(self.ctx.styles.bold)
        );
        for status in statuses {
            let (state, pid) = match status.run {
                RunState::Stopped => ("stopped", "-".to_string()),
                RunState::Running { pid } => ("running", pid.to_string()),
            };
            let repository = status
                .record
                .as_ref()
                .map_or_else(|| "-".to_string(), |r| r.repository.to_string());
            let styles = &self.ctx.styles;
            println!(
                "  {:<24} {} {} {:<8} {}",
                status.name,
                format!("{:<14}", status.installation.as_str())
                    .style(styles.for_installation(status.installation)),
                format!("{state:<8}").style(styles.for_run_state(status.run)),
                pid,
                repository
            );
        }
    }

    /// Render the tail of the worker log.
    pub fn render_logs(&self, log_file: &Path, lines: Option<&[String]>) {
        match lines {
            None => self
                .ctx
                .info(&format!("No log yet at {}", log_file.display())),
            Some(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
        }
    }

    /// Render the effective configuration.
    pub fn render_config(&self, config: &SupervisorConfig, path: &Path, root: &Path) {
        if self.ctx.quiet {
            return;
        }
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<20} {}", "root:", root.display());
        println!("  {:<20} {}", "runner_version:", config.runner_version);
        println!("  {:<20} {}", "download_base_url:", config.download_base_url);
        println!("  {:<20} {}", "service_url:", config.service_url);
        println!("  {:<20} {}", "api_base_url:", config.api_base_url);
        println!("  {:<20} {}", "worker_signature:", config.worker_signature);
        println!();
        println!("  {}", "Timing:".style(self.ctx.styles.bold));
        let t = &config.timing;
        println!("    {:<24} {}", "start_confirm_ms:", t.start_confirm_ms);
        println!("    {:<24} {}", "stop_grace_secs:", t.stop_grace_secs);
        println!("    {:<24} {}", "stop_poll_ms:", t.stop_poll_ms);
        println!("    {:<24} {}", "kill_grace_ms:", t.kill_grace_ms);
        println!("    {:<24} {}", "restart_settle_ms:", t.restart_settle_ms);
        println!("    {:<24} {}", "lock_timeout_secs:", t.lock_timeout_secs);
        println!(
            "    {:<24} {}",
            "config_tool_timeout_secs:", t.config_tool_timeout_secs
        );
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["RUNNERCTL_CONFIG", "RUST_LOG", "NO_COLOR"] {
            println!(
                "    {:<24} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!(
            "    {:<24} {}",
            "GITHUB_TOKEN:",
            if std::env::var_os("GITHUB_TOKEN").is_some() {
                "(set)"
            } else {
                "(not set)"
            }
        );
    }

    /// Render a bare path.
    pub fn render_path(&self, path: &Path) {
        println!("{}", path.display());
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("runnerctl {version}");
    }
}

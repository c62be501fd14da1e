//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
use serde::Serialize;

use crate::application::services::lifecycle::Transition;
use crate::domain::{InstanceStatus, SupervisorConfig};
pub use human::{HumanRenderer, Summarize};
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠` to stderr. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            eprintln!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Dispatches rendering to the human or JSON renderer.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render a lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_transition<O: Summarize + Serialize>(
        &self,
        transition: &Transition<O>,
    ) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_transition(transition);
                Ok(())
            }
            Self::Json(r) => r.print(transition),
        }
    }

    /// Render the status of one instance.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_status(&self, status: &InstanceStatus) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_status(status);
                Ok(())
            }
            Self::Json(r) => r.print(status),
        }
    }

    /// Render all instances.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_list(&self, statuses: &[InstanceStatus]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_list(statuses);
                Ok(())
            }
            Self::Json(r) => r.print(&serde_json::json!({ "runners": statuses })),
        }
    }

    /// Render the tail of the worker log.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_logs(&self, log_file: &Path, lines: Option<&[String]>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_logs(log_file, lines);
                Ok(())
            }
            Self::Json(r) => r.print(&serde_json::json!({
                "file": log_file,
                "lines": lines.unwrap_or_default(),
            })),
        }
    }

    /// Render the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &SupervisorConfig, path: &Path, root: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(config, path, root);
                Ok(())
            }
            Self::Json(r) => r.print(&serde_json::json!({
                "path": path,
                "root": root,
                "config": config,
            })),
        }
    }

    /// Render a path.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_path(&self, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_path(path);
                Ok(())
            }
            Self::Json(r) => r.print(&serde_json::json!({ "path": path })),
        }
    }

    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.print(&serde_json::json!({ "version": version })),
        }
    }
}

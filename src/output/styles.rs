//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

use crate::domain::{InstallationState, RunState};

/// Stylesheet for CLI output. Every field is a plain style until
/// [`Styles::colorize`] is called, so `--no-color` needs no branching.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub dim: Style,
    pub bold: Style,
    pub header: Style,
    /// A live worker.
    pub running: Style,
    /// No worker, or an instance that is not fully set up.
    pub idle: Style,
    /// Installed but never registered; `setup` must be re-run.
    pub incomplete: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
        self.running = Style::new().green().bold();
        self.idle = Style::new().dimmed();
        self.incomplete = Style::new().yellow();
    }

    #[must_use]
    pub fn for_run_state(&self, run: RunState) -> Style {
        match run {
            RunState::Running { .. } => self.running,
            RunState::Stopped => self.idle,
        }
    }

    #[must_use]
    pub fn for_installation(&self, installation: InstallationState) -> Style {
        match installation {
            InstallationState::Configured => self.bold,
            InstallationState::Installed => self.incomplete,
            InstallationState::NotInstalled => self.idle,
        }
    }
}

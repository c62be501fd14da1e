//! Application context: unified state passed to every command handler.
//!
//! `AppContext` resolves the configuration file, the instance root and the
//! host adapters once, so command handlers never read the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::{InstanceLayout, SupervisorConfig};
use crate::infra::SystemHost;
use crate::infra::config::YamlConfigStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by the `CI` / `RUNNERCTL_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
    /// `--root` override.
    pub root: Option<PathBuf>,
    /// `--config` override.
    pub config: Option<PathBuf>,
    /// Credential for the registration API.
    pub api_token: Option<String>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Where the configuration came from.
    pub config_store: YamlConfigStore,
    /// Effective configuration.
    pub config: SupervisorConfig,
    /// Absolute directory holding `runners/` and `locks/`.
    pub root: PathBuf,
    /// Production adapters for every port.
    pub host: SystemHost,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is unreadable or invalid,
    /// or the root directory cannot be resolved.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let config_store = YamlConfigStore::new(flags.config.clone());
        let config = config_store.load()?;
        let root = resolve_root(flags.root.as_deref(), &config)?;
        tracing::debug!(root = %root.display(), "resolved instance root");
        Ok(Self::assemble(flags, config_store, config, root))
    }

    /// Context for commands that never touch instances or configuration.
    #[must_use]
    pub fn without_config(flags: &AppFlags) -> Self {
        let root = flags.root.clone().unwrap_or_default();
        Self::assemble(
            flags,
            YamlConfigStore::new(flags.config.clone()),
            SupervisorConfig::default(),
            root,
        )
    }

    fn assemble(
        flags: &AppFlags,
        config_store: YamlConfigStore,
        config: SupervisorConfig,
        root: PathBuf,
    ) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("RUNNERCTL_YES").is_ok();
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let quiet = flags.output.quiet || mode == OutputMode::Json;
        Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            config_store,
            host: SystemHost::new(&config, flags.api_token.clone()),
            config,
            root,
            non_interactive: flags.behaviour.yes || ci_env,
        }
    }

    /// Layout of the instance called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid instance name.
    pub fn layout(&self, name: &str) -> Result<InstanceLayout> {
        InstanceLayout::new(&self.root, name)
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `RUNNERCTL_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}

/// `--root` wins over `root_dir` in the config file, which wins over
/// `~/.runnerctl`. The result is always absolute.
fn resolve_root(flag: Option<&Path>, config: &SupervisorConfig) -> Result<PathBuf> {
    let chosen = match (flag, &config.root_dir) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => path.clone(),
        (None, None) => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot determine home directory; pass --root"))?
            .join(".runnerctl"),
    };
    std::path::absolute(&chosen)
        .with_context(|| format!("resolving root directory {}", chosen.display()))
}

//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Install and supervise self-hosted CI runners
#[derive(Parser)]
#[command(
    name = "runnerctl",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Increase diagnostic logging on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding all runner instances (default: ~/.runnerctl)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Configuration file (default: ~/.runnerctl/config.yaml)
    #[arg(long, global = true, env = "RUNNERCTL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// API token used to request registration and removal tokens
    #[arg(
        long,
        global = true,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub api_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download, register and start a runner
    Setup(commands::setup::SetupArgs),

    /// Start a configured runner
    Start(commands::InstanceArgs),

    /// Stop a runner (graceful, then forced)
    Stop(commands::InstanceArgs),

    /// Stop then start a runner
    Restart(commands::InstanceArgs),

    /// Show the status of one runner
    Status(commands::InstanceArgs),

    /// List all runners
    List,

    /// Show the runner's log
    Logs(commands::logs::LogsArgs),

    /// Stop, de-register and delete a runner
    Uninstall(commands::uninstall::UninstallArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command
    /// fails.
    pub async fn run(self) -> Result<ExitCode> {
        let flags = AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            behaviour: BehaviourFlags { yes: false },
            root: self.root,
            config: self.config,
            api_token: self.api_token,
        };

        match self.command {
            Command::Version => {
                let app = AppContext::without_config(&flags);
                commands::version::run(&app)
            }
            Command::Setup(args) => commands::setup::run(&AppContext::new(&flags)?, args).await,
            Command::Start(args) => commands::start::run(&AppContext::new(&flags)?, &args).await,
            Command::Stop(args) => commands::stop::run(&AppContext::new(&flags)?, &args).await,
            Command::Restart(args) => {
                commands::restart::run(&AppContext::new(&flags)?, &args).await
            }
            Command::Status(args) => commands::status::run(&AppContext::new(&flags)?, &args).await,
            Command::List => commands::list::run(&AppContext::new(&flags)?).await,
            Command::Logs(args) => commands::logs::run(&AppContext::new(&flags)?, &args),
            Command::Uninstall(args) => {
                let flags = AppFlags {
                    behaviour: BehaviourFlags { yes: args.yes },
                    ..flags
                };
                commands::uninstall::run(&AppContext::new(&flags)?, &args).await
            }
            Command::Config(cmd) => commands::config::run(&AppContext::new(&flags)?, &cmd),
        }
    }
}

//! Command implementations

pub mod config;
pub mod list;
pub mod logs;
pub mod restart;
pub mod setup;
pub mod start;
pub mod status;
pub mod stop;
pub mod uninstall;
pub mod version;

use clap::Args;

/// Arguments shared by commands that act on one runner.
#[derive(Args)]
pub struct InstanceArgs {
    /// Runner name
    pub name: String,
}

//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process inspection and
//! signalling, filesystem access, downloads, the registration API and the
//! runner's helper scripts.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod artifact;
pub mod command_runner;
pub mod config;
pub mod configurator;
pub mod fs;
pub mod github;
pub mod lock;
pub mod process;
pub mod state;

use std::time::Duration;

use crate::domain::SupervisorConfig;
use crate::infra::command_runner::TokioCommandRunner;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The real host: implements every port in `crate::application::ports`.
pub struct SystemHost {
    pub(crate) http: ureq::Agent,
    pub(crate) commands: TokioCommandRunner,
    pub(crate) api_base_url: String,
    pub(crate) api_token: Option<String>,
}

impl SystemHost {
    /// `api_token` authorizes registration and removal token requests.
    #[must_use]
    pub fn new(config: &SupervisorConfig, api_token: Option<String>) -> Self {
        let http = ureq::AgentBuilder::new()
            .timeout_connect(HTTP_TIMEOUT)
            .timeout_read(HTTP_TIMEOUT)
            .user_agent(concat!("runnerctl/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            http,
            commands: TokioCommandRunner::new(config.timing.config_tool_timeout()),
            api_base_url: config.api_base_url.clone(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(&SupervisorConfig::default(), None)
    }
}

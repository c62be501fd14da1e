//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{SupervisorConfig, validate_config};

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    /// `explicit` overrides the default `~/.runnerctl/config.yaml`.
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<SupervisorConfig> {
        let path = self.path()?;
        if !path.exists() {
            if self.explicit.is_some() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            return Ok(SupervisorConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: SupervisorConfig = if content.trim().is_empty() {
            SupervisorConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        };
        validate_config(&config).with_context(|| format!("invalid {}", path.display()))?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".runnerctl").join("config.yaml"))
    }
}

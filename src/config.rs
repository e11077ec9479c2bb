use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::nav::PageChangePolicy;

/// Tuning for a `Navigator`.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Scheduler yields before a page change or popup show starts its
    /// async phase
    pub settle_steps: u32,

    /// How overlapping page changes are resolved
    pub page_change_policy: PageChangePolicy,

    /// Buffer size of the navigation event channel
    pub event_capacity: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            settle_steps: 1,
            page_change_policy: PageChangePolicy::default(),
            event_capacity: 64,
        }
    }
}

impl NavigatorConfig {
    pub fn with_settle_steps(mut self, steps: u32) -> Self {
        self.settle_steps = steps;
        self
    }

    pub fn with_page_change_policy(mut self, policy: PageChangePolicy) -> Self {
        self.page_change_policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Per-user location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("navstack")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".navstack")
        };

        Ok(config_dir.join("navigator.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse navigator config")
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading navigator config from: {:?}", path);

        if !path.exists() {
            info!("Navigator config {:?} doesn't exist, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read navigator config: {:?}", path))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid navigator config: {:?}", path))?;

        debug!("Loaded navigator config: {:?}", config);
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            }
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize navigator config to TOML")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write navigator config: {:?}", path))?;

        info!("Navigator config saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("navstack-{}", uuid::Uuid::new_v4()))
            .join("navigator.toml")
    }

    #[test]
    fn test_default_config() {
        let config = NavigatorConfig::default();

        assert_eq!(config.settle_steps, 1);
        assert_eq!(config.page_change_policy, PageChangePolicy::Supersede);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = NavigatorConfig::from_toml_str("page_change_policy = \"sequential\"").unwrap();

        assert_eq!(config.page_change_policy, PageChangePolicy::Sequential);
        assert_eq!(config.settle_steps, 1);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let err = NavigatorConfig::from_toml_str("page_change_policy = \"whenever\"").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse navigator config"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = NavigatorConfig::load(scratch_path()).unwrap();
        assert_eq!(config, NavigatorConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path();
        let config = NavigatorConfig::default()
            .with_settle_steps(3)
            .with_event_capacity(8)
            .with_page_change_policy(PageChangePolicy::Sequential);

        config.save(&path).unwrap();
        let loaded = NavigatorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).ok();
        }
    }
}

//! YAML loading and validation.

use std::collections::HashSet;
use std::path::Path;

use super::error::ConfigError;
use super::types::SchedulerConfig;

/// Loader for timer queue configuration files.
pub struct YamlLoader;

impl YamlLoader {
    /// Load configuration from a file.
    pub fn load_config(path: impl AsRef<Path>) -> Result<SchedulerConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_config(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse_config(yaml: &str) -> Result<SchedulerConfig, ConfigError> {
        let config: SchedulerConfig = serde_yaml::from_str(yaml)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Validate a configuration.
    fn validate_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
        if config.idle_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "idle_interval_ms cannot be zero".into(),
            ));
        }

        if config.teardown_poll_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "teardown_poll_ms cannot be zero".into(),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        for timer in &config.timers {
            if timer.name.is_empty() {
                return Err(ConfigError::MissingField("timers[].name".into()));
            }

            if !names.insert(&timer.name) {
                return Err(ConfigError::InvalidConfig(format!(
                    "duplicate timer name: {}",
                    timer.name
                )));
            }

            // A repeating timer with no period would never leave the firing pass.
            if timer.repeat && timer.period_ms == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "repeating timer '{}' needs a non-zero period_ms",
                    timer.name
                )));
            }
        }

        Ok(())
    }
}

//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the timer queue and the
//! timers it should run.

mod builder;
mod error;
mod types;
mod yaml;

pub use builder::build_timers;
pub use error::ConfigError;
pub use types::{DEFAULT_TEARDOWN_POLL_MS, SchedulerConfig, TimerConfig};
pub use yaml::YamlLoader;

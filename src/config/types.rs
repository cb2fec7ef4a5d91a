//! Configuration type definitions.
//!
//! This module contains the type definitions for the YAML configuration:
//! worker options and the list of timers to create.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scheduler::{DEFAULT_IDLE_INTERVAL, QueueOptions};

/// Default interval between non-blocking teardown polls, in milliseconds.
pub const DEFAULT_TEARDOWN_POLL_MS: u64 = 10;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Longest the worker sleeps when no timer is armed.
    pub idle_interval_ms: u64,
    /// Interval between `destroy_async` polls during teardown.
    pub teardown_poll_ms: u64,
    /// Optional worker thread name.
    pub thread_name: Option<String>,
    /// Timers to create.
    pub timers: Vec<TimerConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: DEFAULT_IDLE_INTERVAL.as_millis() as u64,
            teardown_poll_ms: DEFAULT_TEARDOWN_POLL_MS,
            thread_name: None,
            timers: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Worker options described by this configuration.
    pub fn queue_options(&self) -> QueueOptions {
        let options =
            QueueOptions::default().with_idle_interval(Duration::from_millis(self.idle_interval_ms));
        match &self.thread_name {
            Some(name) => options.with_thread_name(name),
            None => options,
        }
    }

    /// Teardown poll interval.
    pub fn teardown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.teardown_poll_ms)
    }
}

/// A single timer definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Timer name, unique within the file.
    pub name: String,
    /// Period in milliseconds.
    pub period_ms: u64,
    /// Whether the timer re-arms after firing.
    #[serde(default = "default_true")]
    pub repeat: bool,
    /// Whether the timer is started as soon as it is created.
    #[serde(default = "default_true")]
    pub autostart: bool,
}

fn default_true() -> bool {
    true
}

impl TimerConfig {
    /// Period as a duration.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

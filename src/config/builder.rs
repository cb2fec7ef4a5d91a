//! Timer builder from YAML configuration.
//!
//! This module converts `TimerConfig` entries into timer handles.

use crate::timer::{TimerCallback, TimerHandle};

use super::error::ConfigError;
use super::types::SchedulerConfig;

/// Build one handle per configured timer, in file order.
///
/// `make_callback` is called once per timer with its configuration index and
/// returns the callback that timer will run.
pub fn build_timers<F>(
    config: &SchedulerConfig,
    mut make_callback: F,
) -> Result<Vec<TimerHandle>, ConfigError>
where
    F: FnMut(usize) -> Box<TimerCallback>,
{
    config
        .timers
        .iter()
        .enumerate()
        .map(|(idx, timer)| {
            let callback = make_callback(idx);
            TimerHandle::create(&timer.name, timer.period(), timer.repeat, callback)
                .map_err(|e| ConfigError::InvalidConfig(e.to_string()))
        })
        .collect()
}

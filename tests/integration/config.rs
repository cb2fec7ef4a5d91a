//! Configuration-driven integration tests.
//!
//! Tests that load timers from YAML and run them on a service built from the
//! same configuration.

use std::thread;
use std::time::Duration;
use tickq::testing::{FireRecorder, wait_until};
use tickq::{TimerCallback, TimerService, YamlLoader, build_timers};

/// Test: timers loaded from a file run with the configured options.
#[test]
fn test_run_timers_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timers.yaml");
    std::fs::write(
        &path,
        r#"
idle_interval_ms: 100
thread_name: yaml-timers
timers:
  - name: fast
    period_ms: 20
  - name: once
    period_ms: 30
    repeat: false
  - name: parked
    period_ms: 10
    autostart: false
"#,
    )
    .unwrap();

    let config = YamlLoader::load_config(&path).unwrap();
    let recorder = FireRecorder::new();
    let timers = build_timers(&config, |_| Box::new(recorder.callback()) as Box<TimerCallback>)
        .unwrap();

    let service = TimerService::with_options(config.queue_options());
    assert_eq!(service.options().thread_name, "yaml-timers");

    for (timer, timer_config) in timers.iter().zip(&config.timers) {
        if timer_config.autostart {
            service.start(timer).unwrap();
        }
    }

    assert!(wait_until(Duration::from_secs(5), || {
        recorder.count(timers[0].id()) >= 3 && recorder.count(timers[1].id()) == 1
    }));
    thread::sleep(Duration::from_millis(50));

    service.destroy().unwrap();

    let counts = recorder.counts_by_name();
    assert_eq!(counts.get("once"), Some(&1));
    assert_eq!(counts.get("parked"), None);
    assert!(!timers[2].is_active());
}

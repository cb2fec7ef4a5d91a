//! tickq - run timers on a single background worker.
//!
//! Usage:
//!   tickq run <config>        Run the timers described in a YAML file
//!   tickq validate <config>   Validate a configuration without running
//!   tickq demo                Run two repeating timers (200ms and 500ms)

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tickq::{SchedulerConfig, TimerCallback, TimerConfig, TimerHandle, TimerService, YamlLoader};
use tracing::{error, info, warn};

/// tickq - run timers on a single background worker
#[derive(Parser)]
#[command(name = "tickq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timers described in a configuration file
    Run {
        /// Path to the YAML configuration
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Stop after this many milliseconds (default: run until Ctrl+C)
        #[arg(short = 'd', long)]
        duration_ms: Option<u64>,

        /// Tear the worker down by polling instead of joining it
        #[arg(long)]
        async_teardown: bool,
    },

    /// Validate a configuration file without running
    Validate {
        /// Path to the YAML configuration
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Run two repeating timers (200ms and 500ms) and print their counters
    Demo {
        /// How long to let the timers run
        #[arg(short = 'd', long, default_value = "2000")]
        duration_ms: u64,

        /// Tear the worker down by polling instead of joining it
        #[arg(long)]
        async_teardown: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            duration_ms,
            async_teardown,
        } => {
            let config = YamlLoader::load_config(&config)?;
            run_timers(config, duration_ms.map(Duration::from_millis), async_teardown).await?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::Demo {
            duration_ms,
            async_teardown,
        } => {
            run_timers(
                demo_config(),
                Some(Duration::from_millis(duration_ms)),
                async_teardown,
            )
            .await?;
        }
    }

    Ok(())
}

/// The two timers of the built-in demo.
fn demo_config() -> SchedulerConfig {
    let timer = |name: &str, period_ms| TimerConfig {
        name: name.to_string(),
        period_ms,
        repeat: true,
        autostart: true,
    };

    SchedulerConfig {
        timers: vec![timer("timer 1", 200), timer("timer 2", 500)],
        ..SchedulerConfig::default()
    }
}

/// Callback that logs each firing and bumps the timer's counter.
fn counting_callback(counter: Arc<AtomicU64>) -> Box<TimerCallback> {
    Box::new(move |timer: &TimerHandle| {
        let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!("{} expired ({})", timer.name(), count);
    })
}

/// Create, start, and eventually tear down the configured timers.
async fn run_timers(
    config: SchedulerConfig,
    duration: Option<Duration>,
    async_teardown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.timers.is_empty() {
        warn!("No timers configured");
        return Ok(());
    }

    let counters: Vec<Arc<AtomicU64>> = config
        .timers
        .iter()
        .map(|_| Arc::new(AtomicU64::new(0)))
        .collect();
    let timers = tickq::build_timers(&config, |idx| {
        counting_callback(Arc::clone(&counters[idx]))
    })?;

    let service = TimerService::with_options(config.queue_options());

    info!("Starting {} timer(s):", timers.len());
    for (timer, timer_config) in timers.iter().zip(&config.timers) {
        let mode = if timer.repeats() { "repeat" } else { "one-shot" };
        if timer_config.autostart {
            service.start(timer)?;
            info!("  - {} every {:?} ({})", timer.name(), timer.period(), mode);
        } else {
            info!("  - {} every {:?} ({}, not started)", timer.name(), timer.period(), mode);
        }
    }

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            info!("Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
        }
    }

    info!("Stopping timers");
    for timer in &timers {
        service.stop(timer)?;
    }

    if async_teardown {
        info!(
            "Tearing down (polling every {:?})",
            config.teardown_poll_interval()
        );
        service.shutdown(config.teardown_poll_interval()).await;
    } else {
        service.destroy()?;
    }

    for (timer, counter) in timers.iter().zip(&counters) {
        println!("{}: {}", timer.name(), counter.load(Ordering::Relaxed));
    }

    Ok(())
}

/// Validate a configuration file without running.
fn validate_config(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating: {}", path.display());

    match YamlLoader::load_config(&path) {
        Ok(config) => {
            info!("Configuration is valid ({} timer(s)):", config.timers.len());
            for timer in &config.timers {
                info!(
                    "  - {}: {}ms, repeat={}, autostart={}",
                    timer.name, timer.period_ms, timer.repeat, timer.autostart
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

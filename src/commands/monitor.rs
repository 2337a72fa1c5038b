//! `perfmon run`: live monitoring session on the console.
//!
//! Registers the simulated CPU and memory sources, prints every change
//! notification, reports statistics on a fixed cadence and shuts the
//! monitor down when the session ends or Ctrl+C is pressed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use tokio::sync::Notify;

use crate::core::config::Config;
use crate::core::monitor::MetricMonitor;
use crate::core::simulated::SimulatedMetric;
use crate::ui;

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Number of statistics reports before stopping
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Milliseconds between statistics reports
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Milliseconds between refreshes of each metric
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Read settings from this JSON file instead of the default location
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print notifications and statistics as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Load the config file and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(interval) = self.interval_ms {
            config.report_interval_ms = interval;
        }
        if let Some(poll) = self.poll_ms {
            config.poll_interval_ms = poll;
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn execute(args: &RunArgs) -> Result<()> {
    let config = args.resolve_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("perfmon-worker")
        .build()
        .context("Failed to start Tokio runtime")?;

    runtime.block_on(run(config, args.json))
}

async fn run(config: Config, json: bool) -> Result<()> {
    // Ctrl+C wakes the report loop early
    let interrupted = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());
    {
        let interrupted = interrupted.clone();
        let wake = wake.clone();
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
            wake.notify_one();
        })
        .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;
    }

    let monitor = MetricMonitor::new(config.monitor_config())
        .context("Failed to create metric monitor")?;

    if json {
        monitor.subscribe(|notification| {
            match serde_json::to_string(notification) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to serialize notification: {}", e),
            }
        });
    } else {
        monitor.subscribe(ui::print_notification);
    }
    monitor.subscribe_removals(ui::log_removal);

    monitor.register("cpu", Arc::new(SimulatedMetric::cpu()))?;
    monitor.register("memory", Arc::new(SimulatedMetric::memory()))?;

    if !json {
        ui::print_banner();
        println!(
            "Starting {}-report monitoring session...\n",
            config.iterations
        );
        println!("{}", "Press Ctrl+C at any time to stop".dimmed());
        ui::print_section("LIVE METRICS UPDATES");
    }

    for iteration in 1..=config.iterations {
        tokio::select! {
            _ = tokio::time::sleep(config.report_interval()) => {}
            _ = wake.notified() => {}
        }
        if interrupted.load(Ordering::SeqCst) {
            if !json {
                println!();
                println!("{}", "Stopping monitor...".yellow().bold());
            }
            break;
        }

        let stats = monitor.get_statistics();
        if json {
            println!("{}", serde_json::to_string(&stats)?);
        } else {
            ui::print_statistics(iteration, &stats);
            if iteration < config.iterations {
                ui::print_rule();
            }
        }
    }

    let report = monitor.shutdown().await;
    if !report.is_clean() {
        eprintln!(
            "{}",
            format!(
                "Warning: polling did not stop in time for: {}",
                report.timed_out.join(", ")
            )
            .yellow()
        );
    }

    if !json {
        ui::print_rule();
        println!("\n{}", "Monitoring completed!".green().bold());
    }
    Ok(())
}

//! Console rendering for the `run` command.

use chrono::Local;
use colored::*;

use crate::core::monitor::{ChangeNotification, MetricStatistics};
use crate::core::source::SharedSource;
use crate::core::{RemovalEvent, RemovalReason};

const RULE_WIDTH: usize = 45;

/// Load level of a percentage reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}

impl LoadLevel {
    pub fn from_value(value: f64) -> Self {
        if value > 80.0 {
            LoadLevel::High
        } else if value > 60.0 {
            LoadLevel::Medium
        } else {
            LoadLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LoadLevel::Low => "[LOW]",
            LoadLevel::Medium => "[MEDIUM]",
            LoadLevel::High => "[HIGH]",
        }
    }

    fn colorize(self) -> ColoredString {
        match self {
            LoadLevel::Low => self.label().green(),
            LoadLevel::Medium => self.label().yellow(),
            LoadLevel::High => self.label().red().bold(),
        }
    }
}

fn notification_parts(notification: &ChangeNotification) -> (String, LoadLevel, String) {
    let clock = format!(
        "[{}]",
        notification.timestamp.with_timezone(&Local).format("%H:%M:%S")
    );
    let reading = format!(
        "{:<12}: {:5.1}%",
        notification.metric_name, notification.value
    );
    (clock, LoadLevel::from_value(notification.value), reading)
}

/// `[HH:MM:SS] [LEVEL] name        :  42.0%`, without colors.
pub fn format_notification(notification: &ChangeNotification) -> String {
    let (clock, level, reading) = notification_parts(notification);
    format!("{} {} {}", clock, level.label(), reading)
}

pub fn print_notification(notification: &ChangeNotification) {
    let (clock, level, reading) = notification_parts(notification);
    println!("{} {} {}", clock.dimmed(), level.colorize(), reading);
}

/// One line per statistics field, indented under the iteration header.
pub fn format_statistics(stats: &MetricStatistics) -> Vec<String> {
    match stats.snapshot() {
        None => vec!["  No metrics available".to_string()],
        Some(snapshot) => vec![
            format!("  Timestamp: {}", snapshot.timestamp.format("%H:%M:%S")),
            format!("  TotalMetrics: {}", snapshot.total_metrics),
            format!("  AverageValue: {:.2}", snapshot.average),
            format!("  MaxValue: {:.2}", snapshot.max),
            format!("  MinValue: {:.2}", snapshot.min),
        ],
    }
}

pub fn print_statistics(iteration: u32, stats: &MetricStatistics) {
    println!("{}", format!("Iteration {}:", iteration).bold());
    for line in format_statistics(stats) {
        println!("{}", line);
    }
}

/// Log line for a cache removal; replacements on every refresh stay at trace.
pub fn log_removal(event: &RemovalEvent<String, SharedSource>) {
    match event.reason {
        RemovalReason::Replaced => {
            log::trace!("Cache entry '{}' replaced", event.key)
        }
        reason => log::debug!(
            "Cache entry '{}' ({}) removed: {:?}",
            event.key,
            event.value.name(),
            reason
        ),
    }
}

pub fn print_banner() {
    println!("{}", "=".repeat(49).bright_cyan());
    println!("{}", "     PERFORMANCE MONITORING SYSTEM".bold().bright_cyan());
    println!("{}", "=".repeat(49).bright_cyan());
    println!();
}

pub fn print_rule() {
    println!("{}", "-".repeat(RULE_WIDTH).dimmed());
}

pub fn print_section(title: &str) {
    print_rule();
    println!("{:^width$}", title.bold(), width = RULE_WIDTH);
    print_rule();
}

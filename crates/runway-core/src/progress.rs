//! Step progress output
//!
//! Each pipeline step gets a start line and a closing line with its marker
//! and elapsed time. All of it goes to stderr; stdout belongs to the report.

use crate::pipeline::Step;
use chrono::Local;
use colored::Colorize;
use std::time::{Duration, Instant};

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Success(Duration),
    /// Nothing to do: already present, or declined at a prompt
    Skipped(String),
    Failed(String),
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Detail line under the current step
pub fn detail(message: &str) {
    eprintln!("[{}]   → {}", timestamp().dimmed(), message.cyan());
}

#[derive(Default)]
pub struct StepLogger {
    started: Option<Instant>,
    current: Option<(Step, Instant)>,
    finished: Vec<(Step, StepResult)>,
}

impl StepLogger {
    pub fn new() -> Self {
        Self {
            started: Some(Instant::now()),
            ..Self::default()
        }
    }

    pub fn start_step(&mut self, step: Step) {
        eprintln!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), step.name());
        self.current = Some((step, Instant::now()));
    }

    pub fn step_success(&mut self, message: Option<&str>) {
        let Some((step, start)) = self.current.take() else {
            return;
        };
        let elapsed = start.elapsed();
        eprintln!(
            "[{}] {} {} ({})",
            timestamp().dimmed(),
            "✓".green().bold(),
            message.unwrap_or(step.name()),
            format_duration(elapsed).dimmed()
        );
        self.finished.push((step, StepResult::Success(elapsed)));
    }

    pub fn step_skipped(&mut self, reason: &str) {
        let Some((step, _)) = self.current.take() else {
            return;
        };
        eprintln!(
            "[{}] {} {} ({})",
            timestamp().dimmed(),
            "⏭".yellow(),
            step.name(),
            reason.dimmed()
        );
        self.finished
            .push((step, StepResult::Skipped(reason.to_string())));
    }

    pub fn step_failed(&mut self, error: &str) {
        let Some((step, _)) = self.current.take() else {
            return;
        };
        eprintln!(
            "[{}] {} {}: {}",
            timestamp().dimmed(),
            "✗".red().bold(),
            step.name(),
            error.red()
        );
        self.finished
            .push((step, StepResult::Failed(error.to_string())));
    }

    /// Plain summary lines, without colors
    pub fn summary_lines(&self) -> Vec<String> {
        let total = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let mut lines = vec![format!(
            "{} steps in {}",
            self.finished.len(),
            format_duration(total)
        )];

        let slowest = self
            .finished
            .iter()
            .filter_map(|(step, result)| match result {
                StepResult::Success(elapsed) => Some((step, *elapsed)),
                _ => None,
            })
            .max_by_key(|(_, elapsed)| *elapsed);
        if let Some((step, elapsed)) = slowest {
            lines.push(format!(
                "slowest: {} ({})",
                step.name(),
                format_duration(elapsed)
            ));
        }

        for (step, result) in &self.finished {
            match result {
                StepResult::Skipped(reason) => {
                    lines.push(format!("skipped: {} ({})", step.name(), reason))
                }
                StepResult::Failed(error) => {
                    lines.push(format!("failed: {}: {}", step.name(), error))
                }
                StepResult::Success(_) => {}
            }
        }
        lines
    }

    pub fn print_summary(&self) {
        let failed = self
            .finished
            .iter()
            .any(|(_, result)| matches!(result, StepResult::Failed(_)));
        let rule = "─".repeat(44);

        eprintln!();
        eprintln!("{}", rule);
        for line in self.summary_lines() {
            if line.starts_with("failed:") {
                eprintln!("{}", line.red());
            } else if line.starts_with("skipped:") {
                eprintln!("{}", line.yellow());
            } else {
                eprintln!("{}", line);
            }
        }
        if !failed {
            eprintln!("{}", "provisioning finished".green());
        }
        eprintln!("{}", rule);
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        60.. => format!("{}m {}s", secs / 60, secs % 60),
        1.. => format!("{}.{}s", secs, duration.subsec_millis() / 100),
        _ => format!("{}ms", duration.subsec_millis()),
    }
}

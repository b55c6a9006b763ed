//! Progress reporting and the console comparison table.
//!
//! The orchestrator emits events to a [`Reporter`] and never prints on its
//! own. [`ConsoleReporter`] writes one line per task to stdout.

use crate::result::{ModelReport, ModelSummary, TaskOutcome};
use colored::Colorize;
use std::fmt::Write;

/// Consumer of benchmark progress events.
pub trait Reporter {
    /// A model is about to be evaluated on `task_count` tasks.
    fn model_started(&mut self, _model: &str, _task_count: usize) {}

    /// One task finished.
    fn task_completed(&mut self, _model: &str, _outcome: &TaskOutcome) {}

    /// All tasks for a model finished.
    fn model_completed(&mut self, _report: &ModelReport) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Progress line for one task, without colour.
pub fn format_progress(outcome: &TaskOutcome) -> String {
    let status = if outcome.passed { "✅ pass" } else { "❌ fail" };
    progress_line(outcome, status)
}

fn progress_line(outcome: &TaskOutcome, status: &str) -> String {
    let generation = &outcome.generation;
    format!(
        "{}: {} | {:.2}s | {:.2} tok/s | mem delta {} MB",
        generation.task_id,
        status,
        generation.duration_secs,
        generation.throughput,
        generation.memory_delta
    )
}

/// Prints progress to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn model_started(&mut self, model: &str, task_count: usize) {
        println!();
        println!(
            "{}",
            format!("=== Benchmarking model: {model} ({task_count} tasks) ===").bold()
        );
    }

    fn task_completed(&mut self, _model: &str, outcome: &TaskOutcome) {
        let status = if outcome.passed {
            "✅ pass".green().to_string()
        } else {
            "❌ fail".red().to_string()
        };
        println!("{}", progress_line(outcome, &status));
    }

    fn model_completed(&mut self, report: &ModelReport) {
        let summary = &report.summary;
        println!(
            "{} passed {}/{} ({:.1}%)",
            report.model,
            summary.passed,
            summary.tasks,
            summary.pass_rate * 100.0
        );
    }
}

/// Aligned comparison table of model summaries.
pub fn render_comparison_table<'a>(summaries: impl IntoIterator<Item = &'a ModelSummary>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "=== Comparison ===");
    let _ = writeln!(
        output,
        "{:<20} {:<10} {:<20} {:<20}",
        "Model", "Pass rate", "Avg speed (tok/s)", "Avg mem delta (MB)"
    );
    for summary in summaries {
        let _ = writeln!(
            output,
            "{:<20} {:>6.1}% {:>15.2} {:>20}",
            summary.model,
            summary.pass_rate * 100.0,
            summary.avg_throughput,
            summary.memory_display()
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::fixtures::outcome;
    use llm_codebench_core::MemoryDelta;

    #[test]
    fn test_progress_line() {
        let passed = outcome("HumanEval/1", true, 42.5, MemoryDelta::Available(128));
        assert_eq!(
            format_progress(&passed),
            "HumanEval/1: ✅ pass | 1.00s | 42.50 tok/s | mem delta 128 MB"
        );

        let failed = outcome("HumanEval/2", false, 0.0, MemoryDelta::Unavailable);
        assert_eq!(
            format_progress(&failed),
            "HumanEval/2: ❌ fail | 1.00s | 0.00 tok/s | mem delta -1 MB"
        );
    }

    #[test]
    fn test_comparison_table_rows() {
        let with_mem = ModelSummary {
            model: "qwen2.5-coder:14b".to_string(),
            tasks: 4,
            passed: 3,
            pass_rate: 0.75,
            avg_throughput: 31.456,
            avg_memory_delta_mb: Some(212.4),
        };
        let without_mem = ModelSummary {
            model: "yi:9b".to_string(),
            avg_memory_delta_mb: None,
            ..with_mem.clone()
        };

        let table = render_comparison_table([&with_mem, &without_mem]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Model "));
        assert!(lines[2].starts_with("qwen2.5-coder:14b "));
        assert!(lines[2].contains("  75.0%"));
        assert!(lines[2].contains("31.46"));
        assert!(lines[2].ends_with("212"));
        assert!(lines[3].ends_with("N/A"));
    }

    #[derive(Default)]
    struct Counting {
        tasks: usize,
    }

    impl Reporter for Counting {
        fn task_completed(&mut self, _model: &str, _outcome: &TaskOutcome) {
            self.tasks += 1;
        }
    }

    #[test]
    fn test_default_hooks_are_optional() {
        let mut reporter = Counting::default();
        reporter.model_started("m", 1);
        reporter.task_completed("m", &outcome("a", true, 1.0, MemoryDelta::Unavailable));
        assert_eq!(reporter.tasks, 1);
    }
}

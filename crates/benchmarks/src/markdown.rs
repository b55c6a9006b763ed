//! Markdown output generation for benchmark results.

use crate::result::BenchmarkReport;
use std::fmt::Write;

/// Generate a markdown summary: one comparison row per model, then the
/// per-task verdicts.
pub fn generate_summary(report: &BenchmarkReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Code Generation Benchmark");
    let _ = writeln!(output);
    let _ = writeln!(output, "Run: {}", report.run_id);
    let _ = writeln!(output, "Generated: {}", report.finished_at.to_rfc3339());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Comparison");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "| Model | Pass rate | Avg speed (tok/s) | Avg mem delta (MB) |"
    );
    let _ = writeln!(output, "|-------|-----------|-------------------|--------------------|");

    for summary in report.summaries() {
        let _ = writeln!(
            output,
            "| {} | {:.1}% ({}/{}) | {:.2} | {} |",
            summary.model,
            summary.pass_rate * 100.0,
            summary.passed,
            summary.tasks,
            summary.avg_throughput,
            summary.memory_display()
        );
    }

    for model in &report.models {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", model.model);
        let _ = writeln!(output);
        let _ = writeln!(output, "| Task | Result | Time (s) | Speed (tok/s) |");
        let _ = writeln!(output, "|------|--------|----------|---------------|");
        for outcome in &model.outcomes {
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {:.2} |",
                outcome.task_id(),
                if outcome.passed { "pass" } else { "fail" },
                outcome.generation.duration_secs,
                outcome.generation.throughput
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(
        output,
        "Models: {}, rows: {}",
        report.models.len(),
        report.row_count()
    );

    output
}

//! Benchmark result types.
//!
//! [`GenerationResult`] holds the measurements of one request,
//! [`TaskOutcome`] adds the verdict, and [`ModelSummary`] aggregates a
//! model's outcomes. A full run is a [`BenchmarkReport`].

use chrono::{DateTime, Utc};
use llm_codebench_core::MemoryDelta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tokens per second, or 0 when no time elapsed.
pub fn throughput(token_count: usize, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        token_count as f64 / duration_secs
    } else {
        0.0
    }
}

/// Whitespace-separated token count of a response.
pub fn whitespace_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Measurements for one (model, task) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Task the request was for.
    pub task_id: String,
    /// Unmodified model output.
    pub raw_response: String,
    /// Code pulled out of the response; may be empty.
    pub code: String,
    /// Wall-clock request time in seconds.
    pub duration_secs: f64,
    /// Whitespace token count of `raw_response`.
    pub token_count: usize,
    /// `token_count / duration_secs`, 0 when the duration is 0.
    pub throughput: f64,
    /// GPU memory change across the request.
    pub memory_delta: MemoryDelta,
    /// Completion tokens reported by the server, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

/// A generation result with its verification verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Measurements.
    #[serde(flatten)]
    pub generation: GenerationResult,
    /// Whether the extracted code passed the task's tests.
    pub passed: bool,
}

impl TaskOutcome {
    /// Task id shortcut.
    pub fn task_id(&self) -> &str {
        &self.generation.task_id
    }
}

/// Aggregate statistics for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model identifier.
    pub model: String,
    /// Number of tasks run.
    pub tasks: usize,
    /// Number of tasks passed.
    pub passed: usize,
    /// `passed / tasks`, in [0, 1].
    pub pass_rate: f64,
    /// Mean throughput over all tasks.
    pub avg_throughput: f64,
    /// Mean memory delta over tasks with telemetry; `None` if there were none.
    pub avg_memory_delta_mb: Option<f64>,
}

impl ModelSummary {
    /// Summarise a model's outcomes.
    pub fn from_outcomes(model: impl Into<String>, outcomes: &[TaskOutcome]) -> Self {
        let tasks = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed).count();
        let speed_total: f64 = outcomes.iter().map(|o| o.generation.throughput).sum();
        let deltas: Vec<i64> = outcomes
            .iter()
            .filter_map(|o| o.generation.memory_delta.mb())
            .collect();

        let (pass_rate, avg_throughput) = if tasks == 0 {
            (0.0, 0.0)
        } else {
            (passed as f64 / tasks as f64, speed_total / tasks as f64)
        };

        let avg_memory_delta_mb = if deltas.is_empty() {
            None
        } else {
            Some(deltas.iter().sum::<i64>() as f64 / deltas.len() as f64)
        };

        Self {
            model: model.into(),
            tasks,
            passed,
            pass_rate,
            avg_throughput,
            avg_memory_delta_mb,
        }
    }

    /// Average memory delta as shown to users: whole MB or `N/A`.
    pub fn memory_display(&self) -> String {
        match self.avg_memory_delta_mb {
            Some(mb) => format!("{mb:.0}"),
            None => "N/A".to_string(),
        }
    }
}

/// All outcomes for one model, in task order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    /// Model identifier.
    pub model: String,
    /// Per-task outcomes.
    pub outcomes: Vec<TaskOutcome>,
    /// Aggregates over `outcomes`.
    pub summary: ModelSummary,
}

impl ModelReport {
    /// Build a report and its summary.
    pub fn new(model: impl Into<String>, outcomes: Vec<TaskOutcome>) -> Self {
        let model = model.into();
        let summary = ModelSummary::from_outcomes(model.clone(), &outcomes);
        Self {
            model,
            outcomes,
            summary,
        }
    }
}

/// Result of a whole benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last model finished.
    pub finished_at: DateTime<Utc>,
    /// Per-model reports in evaluation order.
    pub models: Vec<ModelReport>,
}

impl BenchmarkReport {
    /// Model summaries in evaluation order.
    pub fn summaries(&self) -> impl Iterator<Item = &ModelSummary> {
        self.models.iter().map(|m| &m.summary)
    }

    /// Total number of (model, task) rows.
    pub fn row_count(&self) -> usize {
        self.models.iter().map(|m| m.outcomes.len()).sum()
    }
}

//! Measurement and verification pipeline for LLM Codebench.
//!
//! A run evaluates each model on the same ordered task list. For every
//! (model, task) pair the pipeline issues one generation request while
//! sampling GPU memory, extracts code from the response, runs the task's
//! tests against it in a subprocess and records the verdict.
//!
//! # Quick Start
//!
//! ```no_run
//! use llm_codebench_adapters::prelude::*;
//! use llm_codebench_benchmarks::{io, Benchmark, ConsoleReporter};
//! use llm_codebench_core::TaskCorpus;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpChatClient::new(
//!     "http://localhost:11434",
//!     ApiFlavor::Ollama,
//!     std::time::Duration::from_secs(600),
//! )?;
//! let telemetry = TelemetryReader::from_settings(&TelemetrySettings::default());
//! let verifier = Verifier::default();
//! let corpus = TaskCorpus::load("HumanEval.jsonl")?;
//!
//! let report = Benchmark::new(&backend, &telemetry, &verifier)
//!     .run(&["codellama:7b".to_string()], &corpus, 3, &mut ConsoleReporter)
//!     .await?;
//! io::write_results_csv(&report, io::DEFAULT_CSV_FILE)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`extract`] - pulling code out of free-form responses
//! - [`runner`] - one measured generation request
//! - [`orchestrator`] - the models x tasks loop
//! - [`result`] - per-task and per-model result types
//! - [`report`] - progress events and the comparison table
//! - [`io`] - CSV and JSON output
//! - [`markdown`] - Markdown summary

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod extract;
pub mod io;
pub mod markdown;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod runner;

pub use extract::{extract_code, CodeExtractor, DefinitionScan, ExtractStrategy, FencedBlock};
pub use orchestrator::{Benchmark, BenchmarkSettings, DEFAULT_REQUEST_DELAY};
pub use report::{render_comparison_table, ConsoleReporter, NullReporter, Reporter};
pub use result::{BenchmarkReport, GenerationResult, ModelReport, ModelSummary, TaskOutcome};
pub use runner::{build_prompt, GenerationRunner};

use llm_codebench_adapters::backend::BackendError;
use thiserror::Error;

/// Errors that abort a benchmark run.
#[derive(Error, Debug)]
pub enum BenchError {
    /// A generation request failed. No retry is attempted.
    #[error("Backend request failed for model '{model}' on task '{task_id}': {source}")]
    Backend {
        /// Model being evaluated.
        model: String,
        /// Task being generated.
        task_id: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// The run was started without any models.
    #[error("No models to benchmark")]
    NoModels,
}

/// Result type for benchmark runs.
pub type Result<T> = std::result::Result<T, BenchError>;

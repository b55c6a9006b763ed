//! Benchmark orchestrator: models x tasks, strictly in sequence.

use crate::extract::CodeExtractor;
use crate::report::Reporter;
use crate::result::{BenchmarkReport, ModelReport, TaskOutcome};
use crate::runner::GenerationRunner;
use crate::{BenchError, Result};
use chrono::Utc;
use llm_codebench_adapters::backend::ChatBackend;
use llm_codebench_adapters::sandbox::Verifier;
use llm_codebench_adapters::telemetry::TelemetryReader;
use llm_codebench_core::TaskCorpus;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Default pause after each request.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(3);

/// Knobs for a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkSettings {
    /// Pause after every request; zero disables it.
    pub request_delay: Duration,
    /// Append `check(<entry_point>)` to HumanEval test fragments.
    pub invoke_check: bool,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            request_delay: DEFAULT_REQUEST_DELAY,
            invoke_check: false,
        }
    }
}

/// Drives the generate, extract, verify loop over every model and task.
pub struct Benchmark<'a> {
    backend: &'a dyn ChatBackend,
    telemetry: &'a TelemetryReader,
    verifier: &'a Verifier,
    extractor: CodeExtractor,
    settings: BenchmarkSettings,
}

impl<'a> Benchmark<'a> {
    /// Benchmark with default settings and extractor chain.
    pub fn new(
        backend: &'a dyn ChatBackend,
        telemetry: &'a TelemetryReader,
        verifier: &'a Verifier,
    ) -> Self {
        Self {
            backend,
            telemetry,
            verifier,
            extractor: CodeExtractor::default(),
            settings: BenchmarkSettings::default(),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: BenchmarkSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the extractor chain.
    pub fn with_extractor(mut self, extractor: CodeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Evaluate `models` on the first `sample_limit` tasks (0 = all).
    ///
    /// Every model sees the same ordered task list. The first backend
    /// failure aborts the run and nothing is returned for completed models.
    pub async fn run(
        &self,
        models: &[String],
        corpus: &TaskCorpus,
        sample_limit: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<BenchmarkReport> {
        if models.is_empty() {
            return Err(BenchError::NoModels);
        }

        let tasks = corpus.sample(sample_limit);
        let runner = GenerationRunner::new(self.backend, self.telemetry, &self.extractor);
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let mut reports = Vec::with_capacity(models.len());

        info!(
            %run_id,
            models = models.len(),
            tasks = tasks.len(),
            "Starting benchmark run"
        );

        for model in models {
            reporter.model_started(model, tasks.len());
            let mut outcomes = Vec::with_capacity(tasks.len());

            for task in tasks {
                let generation = runner.run(task, model).await.map_err(|source| {
                    BenchError::Backend {
                        model: model.clone(),
                        task_id: task.task_id.clone(),
                        source,
                    }
                })?;

                let test_fragment = task.test_fragment(self.settings.invoke_check);
                let passed = self.verifier.verify(&generation.code, &test_fragment).await;

                let outcome = TaskOutcome { generation, passed };
                reporter.task_completed(model, &outcome);
                outcomes.push(outcome);

                if !self.settings.request_delay.is_zero() {
                    tokio::time::sleep(self.settings.request_delay).await;
                }
            }

            let report = ModelReport::new(model.clone(), outcomes);
            info!(
                model = %report.model,
                pass_rate = report.summary.pass_rate,
                avg_throughput = report.summary.avg_throughput,
                "Model finished"
            );
            reporter.model_completed(&report);
            reports.push(report);
        }

        Ok(BenchmarkReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            models: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DefinitionScan;
    use crate::report::NullReporter;
    use crate::result::ModelSummary;
    use crate::runner::mocks::{MockBackend, ScriptedTelemetry};
    use llm_codebench_adapters::backend::{BackendError, ChatCompletion};
    use llm_codebench_adapters::telemetry::DisabledTelemetry;
    use llm_codebench_core::{MemoryDelta, Task};

    fn corpus() -> TaskCorpus {
        TaskCorpus::new(vec![
            Task::new("t/0", "first", "true"),
            Task::new("t/1", "second", "true"),
            Task::new("t/2", "third", "true"),
        ])
        .unwrap()
    }

    fn no_delay() -> BenchmarkSettings {
        BenchmarkSettings {
            request_delay: Duration::ZERO,
            invoke_check: false,
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Reporter for Recorder {
        fn model_started(&mut self, model: &str, task_count: usize) {
            self.events.push(format!("start {model} {task_count}"));
        }

        fn task_completed(&mut self, model: &str, outcome: &TaskOutcome) {
            self.events.push(format!("task {model} {}", outcome.task_id()));
        }

        fn model_completed(&mut self, report: &ModelReport) {
            self.events.push(format!("done {}", report.model));
        }
    }

    #[tokio::test]
    async fn test_every_model_sees_same_ordered_tasks() {
        let mut backend = MockBackend::new();
        backend
            .expect_chat()
            .times(4)
            .returning(|_, _| Ok(ChatCompletion::text("```\necho ok\n```")));

        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let bench = Benchmark::new(&backend, &telemetry, &verifier).with_settings(no_delay());

        let models = vec!["a".to_string(), "b".to_string()];
        let mut recorder = Recorder::default();
        let report = bench.run(&models, &corpus(), 2, &mut recorder).await.unwrap();

        assert_eq!(
            recorder.events,
            vec![
                "start a 2", "task a t/0", "task a t/1", "done a",
                "start b 2", "task b t/0", "task b t/1", "done b",
            ]
        );
        assert_eq!(report.models.len(), 2);
        assert_eq!(report.row_count(), 4);
        for model in &report.models {
            assert_eq!(model.summary.pass_rate, 1.0);
            assert_eq!(model.summary.avg_memory_delta_mb, None);
        }
    }

    #[tokio::test]
    async fn test_sample_limit_zero_runs_everything() {
        let mut backend = MockBackend::new();
        backend
            .expect_chat()
            .times(3)
            .returning(|_, _| Ok(ChatCompletion::text("exit 1")));

        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let bench = Benchmark::new(&backend, &telemetry, &verifier).with_settings(no_delay());

        let report = bench
            .run(&["m".to_string()], &corpus(), 0, &mut NullReporter)
            .await
            .unwrap();
        assert_eq!(report.models[0].outcomes.len(), 3);
        assert_eq!(report.models[0].summary.pass_rate, 0.0);
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_run() {
        let mut backend = MockBackend::new();
        let mut calls = 0;
        backend.expect_chat().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(ChatCompletion::text("true"))
            } else {
                Err(BackendError::Status {
                    status: 404,
                    body: "model not found".to_string(),
                })
            }
        });

        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let bench = Benchmark::new(&backend, &telemetry, &verifier).with_settings(no_delay());

        let models = vec!["m1".to_string(), "m2".to_string()];
        let err = bench
            .run(&models, &corpus(), 0, &mut NullReporter)
            .await
            .unwrap_err();
        match err {
            BenchError::Backend { model, task_id, .. } => {
                assert_eq!(model, "m1");
                assert_eq!(task_id, "t/1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_memory_deltas_are_recorded_per_task() {
        let mut backend = MockBackend::new();
        backend
            .expect_chat()
            .returning(|_, _| Ok(ChatCompletion::text("true")));

        let telemetry = TelemetryReader::new(Box::new(ScriptedTelemetry::new([
            Some(100),
            Some(150),
            None,
            Some(150),
        ])));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let bench = Benchmark::new(&backend, &telemetry, &verifier).with_settings(no_delay());

        let report = bench
            .run(&["m".to_string()], &corpus(), 2, &mut NullReporter)
            .await
            .unwrap();
        let outcomes = &report.models[0].outcomes;
        assert_eq!(outcomes[0].generation.memory_delta, MemoryDelta::Available(50));
        assert_eq!(outcomes[1].generation.memory_delta, MemoryDelta::Unavailable);
        assert_eq!(report.models[0].summary.avg_memory_delta_mb, Some(50.0));
    }

    #[tokio::test]
    async fn test_no_models_is_an_error() {
        let backend = MockBackend::new();
        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::default();
        let bench = Benchmark::new(&backend, &telemetry, &verifier);

        let err = bench.run(&[], &corpus(), 0, &mut NullReporter).await.unwrap_err();
        assert!(matches!(err, BenchError::NoModels));
    }

    #[tokio::test]
    async fn test_request_delay_is_applied_after_each_task() {
        let mut backend = MockBackend::new();
        backend
            .expect_chat()
            .returning(|_, _| Ok(ChatCompletion::text("true")));

        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let delay = Duration::from_millis(50);
        let bench = Benchmark::new(&backend, &telemetry, &verifier).with_settings(
            BenchmarkSettings {
                request_delay: delay,
                invoke_check: false,
            },
        );

        let start = std::time::Instant::now();
        let report = bench
            .run(&["m".to_string()], &corpus(), 2, &mut NullReporter)
            .await
            .unwrap();
        assert!(start.elapsed() >= delay * 2);
        assert_eq!(
            report.models[0].summary,
            ModelSummary::from_outcomes("m", &report.models[0].outcomes)
        );
    }

    #[tokio::test]
    async fn test_custom_extractor_chain_is_used() {
        let mut backend = MockBackend::new();
        backend.expect_chat().times(2).returning(|_, _| {
            Ok(ChatCompletion::text(
                "Here it is:\nadd() { echo $(($1 + $2)); }\n\nAll done (really",
            ))
        });

        let corpus = TaskCorpus::new(vec![Task::new(
            "sh/add",
            "add two numbers",
            r#"[ "$(add 1 2)" = 3 ]"#,
        )])
        .unwrap();
        let telemetry = TelemetryReader::new(Box::new(DisabledTelemetry));
        let verifier = Verifier::new("sh", Duration::from_secs(5));
        let models = vec!["m".to_string()];

        let default_chain = Benchmark::new(&backend, &telemetry, &verifier).with_settings(no_delay());
        let report = default_chain
            .run(&models, &corpus, 0, &mut NullReporter)
            .await
            .unwrap();
        assert_eq!(report.models[0].summary.pass_rate, 0.0);

        let custom_chain = Benchmark::new(&backend, &telemetry, &verifier)
            .with_settings(no_delay())
            .with_extractor(CodeExtractor::new(vec![Box::new(DefinitionScan::new([
                "add()",
            ]))]));
        let report = custom_chain
            .run(&models, &corpus, 0, &mut NullReporter)
            .await
            .unwrap();
        assert_eq!(
            report.models[0].outcomes[0].generation.code,
            "add() { echo $(($1 + $2)); }"
        );
        assert_eq!(report.models[0].summary.pass_rate, 1.0);
    }
}

//! Generation runner: one measured request per task.

use crate::extract::CodeExtractor;
use crate::result::{throughput, whitespace_tokens, GenerationResult};
use llm_codebench_adapters::backend::{BackendError, ChatBackend, ChatMessage};
use llm_codebench_adapters::telemetry::TelemetryReader;
use llm_codebench_core::{MemoryDelta, Task};
use std::time::Instant;
use tracing::debug;

/// Wrap a task prompt in the fixed generation instructions.
pub fn build_prompt(task_prompt: &str) -> String {
    format!(
        "Please generate complete Python code for this function. Only output the code, no explanations.\n\
         {task_prompt}\n\
         Remember to generate the complete function implementation."
    )
}

/// Issues generation requests and measures them.
pub struct GenerationRunner<'a> {
    backend: &'a dyn ChatBackend,
    telemetry: &'a TelemetryReader,
    extractor: &'a CodeExtractor,
}

impl<'a> GenerationRunner<'a> {
    /// Runner over the given collaborators.
    pub fn new(
        backend: &'a dyn ChatBackend,
        telemetry: &'a TelemetryReader,
        extractor: &'a CodeExtractor,
    ) -> Self {
        Self {
            backend,
            telemetry,
            extractor,
        }
    }

    /// Generate code for `task` with `model`.
    ///
    /// Telemetry is sampled right before and right after the request; the
    /// timer covers only the request itself. Backend errors are returned
    /// as-is, without retry.
    pub async fn run(&self, task: &Task, model: &str) -> Result<GenerationResult, BackendError> {
        let messages = [ChatMessage::user(build_prompt(&task.prompt))];

        let start_mem = self.telemetry.read_memory_mb().await;
        let start = Instant::now();

        let completion = self.backend.chat(model, &messages).await?;

        let duration_secs = start.elapsed().as_secs_f64();
        let end_mem = self.telemetry.read_memory_mb().await;

        let code = self.extractor.extract(&completion.content);
        let token_count = whitespace_tokens(&completion.content);
        let memory_delta = MemoryDelta::between(start_mem, end_mem);

        debug!(
            task_id = %task.task_id,
            model,
            duration_secs,
            token_count,
            "Generation finished"
        );

        Ok(GenerationResult {
            task_id: task.task_id.clone(),
            code,
            duration_secs,
            token_count,
            throughput: throughput(token_count, duration_secs),
            memory_delta,
            completion_tokens: completion.completion_tokens,
            raw_response: completion.content,
        })
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use async_trait::async_trait;
    use llm_codebench_adapters::backend::{BackendError, ChatBackend, ChatCompletion, ChatMessage};
    use llm_codebench_adapters::telemetry::{TelemetryError, TelemetrySource};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    mockall::mock! {
        pub Backend {}

        #[async_trait]
        impl ChatBackend for Backend {
            async fn chat(
                &self,
                model: &str,
                messages: &[ChatMessage],
            ) -> Result<ChatCompletion, BackendError>;
        }
    }

    /// Telemetry source that replays a fixed list of readings.
    pub struct ScriptedTelemetry {
        readings: Mutex<VecDeque<Option<u64>>>,
    }

    impl ScriptedTelemetry {
        pub fn new(readings: impl IntoIterator<Item = Option<u64>>) -> Self {
            Self {
                readings: Mutex::new(readings.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl TelemetrySource for ScriptedTelemetry {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn used_memory_mb(&self) -> Result<u64, TelemetryError> {
            let next = self.readings.lock().unwrap().pop_front().flatten();
            next.ok_or_else(|| TelemetryError::Command("no reading".to_string()))
        }
    }
}

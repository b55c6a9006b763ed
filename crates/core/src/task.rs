// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Code-generation tasks and the corpus that holds them.
//!
//! The corpus is read from a HumanEval-style JSON Lines file: one object per
//! line carrying `task_id`, `prompt`, `test` and an optional `entry_point`.
//! Iteration order is the file order, and every model is evaluated against
//! the same ordered sequence.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A single benchmark task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, e.g. `HumanEval/0`.
    pub task_id: String,
    /// Natural-language prompt (usually a signature plus docstring).
    pub prompt: String,
    /// Executable assertions; assumes the candidate function is in scope.
    pub test: String,
    /// Name of the function under test, when the corpus provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

impl Task {
    /// Create a task without an entry point.
    pub fn new(
        task_id: impl Into<String>,
        prompt: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            prompt: prompt.into(),
            test: test.into(),
            entry_point: None,
        }
    }

    /// Set the entry point.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    /// Test fragment to run after the candidate code.
    ///
    /// HumanEval fragments only define `check(candidate)`. With
    /// `invoke_check` set and an entry point known, a call to
    /// `check(<entry_point>)` is appended so the assertions actually run.
    pub fn test_fragment(&self, invoke_check: bool) -> String {
        match (&self.entry_point, invoke_check) {
            (Some(entry_point), true) => format!("{}\ncheck({})\n", self.test, entry_point),
            _ => self.test.clone(),
        }
    }
}

/// Ordered, duplicate-free task sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCorpus {
    tasks: Vec<Task>,
}

impl TaskCorpus {
    /// Build a corpus from tasks, rejecting duplicate ids.
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.task_id.as_str()) {
                return Err(Error::invalid_input(format!(
                    "duplicate task id '{}'",
                    task.task_id
                )));
            }
        }
        Ok(Self { tasks })
    }

    /// Load a JSON Lines corpus from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::parse_jsonl(&content)?;
        tracing::info!(
            path = %path.display(),
            tasks = corpus.len(),
            "Loaded task corpus"
        );
        Ok(corpus)
    }

    /// Parse JSON Lines content. Blank lines are skipped.
    pub fn parse_jsonl(content: &str) -> Result<Self> {
        let mut tasks = Vec::new();
        let mut seen = HashSet::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let task: Task =
                serde_json::from_str(line).map_err(|e| Error::parse(line_no, e.to_string()))?;
            if !seen.insert(task.task_id.clone()) {
                return Err(Error::DuplicateTask {
                    task_id: task.task_id,
                    line: line_no,
                });
            }
            tasks.push(task);
        }

        Ok(Self { tasks })
    }

    /// The first `sample_limit` tasks. Zero selects everything.
    pub fn sample(&self, sample_limit: usize) -> &[Task] {
        if sample_limit == 0 {
            &self.tasks
        } else {
            &self.tasks[..sample_limit.min(self.tasks.len())]
        }
    }

    /// Tasks in evaluation order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the corpus has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

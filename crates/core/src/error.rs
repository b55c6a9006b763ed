// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error type shared by the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating benchmark inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the corpus file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A corpus line could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// The same task id appeared twice.
    #[error("Duplicate task id '{task_id}' on line {line}")]
    DuplicateTask {
        /// Offending id.
        task_id: String,
        /// 1-based line number of the second occurrence.
        line: usize,
    },

    /// Tasks handed in directly were inconsistent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create an [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

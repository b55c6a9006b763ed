// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for LLM Codebench.
//!
//! - [`task`] - benchmark tasks and the ordered corpus
//! - [`telemetry`] - GPU memory samples and per-request deltas
//! - [`error`] - the crate error type

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod task;
pub mod telemetry;

pub use error::{Error, Result};
pub use task::{Task, TaskCorpus};
pub use telemetry::{MemoryDelta, TelemetrySample, UNAVAILABLE_SENTINEL};

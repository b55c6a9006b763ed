// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Adapters for the external collaborators of LLM Codebench.
//!
//! - **Backend**: chat-completion client for Ollama and OpenAI-compatible servers
//! - **Telemetry**: GPU memory readings via NVML or `nvidia-smi`
//! - **Sandbox**: subprocess verifier with a hard timeout
//!
//! Each adapter hides an external process or service behind a small API so
//! the benchmark pipeline can be tested against stubs.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod sandbox;
pub mod telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::backend::{
        ApiFlavor, BackendError, ChatBackend, ChatCompletion, ChatMessage, HttpChatClient, Role,
    };
    pub use super::sandbox::{Verification, Verifier};
    pub use super::telemetry::{
        select_source, DisabledTelemetry, ShellFallback, TelemetryError, TelemetryReader,
        TelemetrySettings, TelemetrySource,
    };
}

pub use backend::{ChatBackend, HttpChatClient};
pub use sandbox::Verifier;
pub use telemetry::TelemetryReader;

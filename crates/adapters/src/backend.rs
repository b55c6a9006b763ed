// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chat-completion backend adapter.
//!
//! The benchmark talks to the model server through the [`ChatBackend`] trait.
//! [`HttpChatClient`] implements it for two wire flavours:
//!
//! - **Ollama**: `POST {url}/api/chat` with `stream: false`
//! - **OpenAI-compatible**: `POST {url}/v1/chat/completions`
//!
//! The client is built once at startup and handed to the runner by
//! reference. Requests are never retried; every failure surfaces as a
//! [`BackendError`].
//!
//! # Example
//!
//! ```ignore
//! use llm_codebench_adapters::backend::{ApiFlavor, ChatBackend, ChatMessage, HttpChatClient};
//!
//! let client = HttpChatClient::new("http://localhost:11434", ApiFlavor::Ollama, timeout)?;
//! let reply = client.chat("qwen2.5-coder:14b", &[ChatMessage::user("hi")]).await?;
//! println!("{}", reply.content);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default Ollama endpoint.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors returned by a chat backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Response body did not carry the expected content.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user turn
    User,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Completion returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    /// Generated text.
    pub content: String,
    /// Completion tokens as counted by the server, when reported.
    pub completion_tokens: Option<u64>,
}

impl ChatCompletion {
    /// Completion with no server-side token count.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            completion_tokens: None,
        }
    }
}

/// A chat-completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `messages` to `model` and return its reply.
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion>;
}

/// Wire protocol spoken by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// Ollama native API.
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions (vLLM, llama.cpp, LM Studio).
    #[serde(alias = "openai")]
    OpenAi,
}

impl ApiFlavor {
    fn path(&self) -> &'static str {
        match self {
            ApiFlavor::Ollama => "/api/chat",
            ApiFlavor::OpenAi => "/v1/chat/completions",
        }
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFlavor::Ollama => write!(f, "ollama"),
            ApiFlavor::OpenAi => write!(f, "open_ai"),
        }
    }
}

impl FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ApiFlavor::Ollama),
            "openai" | "open_ai" | "open-ai" => Ok(ApiFlavor::OpenAi),
            other => Err(format!("unknown backend flavor: {other}")),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<ResponseMessage>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    completion_tokens: Option<u64>,
}

/// Parse a response body for the given flavour.
fn parse_completion(flavor: ApiFlavor, body: &str) -> Result<ChatCompletion> {
    let malformed = |e: serde_json::Error| BackendError::MalformedResponse(e.to_string());
    match flavor {
        ApiFlavor::Ollama => {
            let resp: OllamaChatResponse = serde_json::from_str(body).map_err(malformed)?;
            let content = resp
                .message
                .and_then(|m| m.content)
                .ok_or_else(|| BackendError::MalformedResponse("missing message.content".into()))?;
            Ok(ChatCompletion {
                content,
                completion_tokens: resp.eval_count,
            })
        }
        ApiFlavor::OpenAi => {
            let resp: OpenAiChatResponse = serde_json::from_str(body).map_err(malformed)?;
            let content = resp
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content)
                .ok_or_else(|| {
                    BackendError::MalformedResponse("missing choices[0].message.content".into())
                })?;
            Ok(ChatCompletion {
                content,
                completion_tokens: resp.usage.and_then(|u| u.completion_tokens),
            })
        }
    }
}

/// HTTP chat client for Ollama or OpenAI-compatible servers.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    endpoint: String,
    flavor: ApiFlavor,
}

impl HttpChatClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, flavor: ApiFlavor, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), flavor.path()),
            flavor,
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Wire flavour in use.
    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatCompletion> {
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        debug!(endpoint = %self.endpoint, model, "Sending chat request");
        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(self.flavor, &body)
    }
}

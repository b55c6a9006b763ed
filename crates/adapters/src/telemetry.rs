// Copyright 2025 LLM Codebench Contributors
// SPDX-License-Identifier: Apache-2.0

//! GPU memory telemetry adapter.
//!
//! Reads used GPU memory (MB) for device 0 through a [`TelemetrySource`]:
//!
//! - [`NativeQuery`]: NVML, when the `nvml` feature is enabled and the
//!   library initialises. Per-call failures fall through to the shell query.
//! - [`ShellFallback`]: `nvidia-smi --query-gpu=memory.used`, bounded by a
//!   timeout.
//! - [`DisabledTelemetry`]: never reads anything.
//!
//! The source is picked once by [`select_source`]. [`TelemetryReader`] wraps it
//! and turns every failure into [`TelemetrySample::Unavailable`], so callers
//! never see an error.

use async_trait::async_trait;
use llm_codebench_core::TelemetrySample;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Default bound on the `nvidia-smi` invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while taking a reading.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// No GPU telemetry mechanism is usable.
    #[error("GPU telemetry unavailable: {0}")]
    Unavailable(String),

    /// The external command did not finish in time.
    #[error("Telemetry command timed out after {0:?}")]
    Timeout(Duration),

    /// The external command could not be run or exited with failure.
    #[error("Telemetry command failed: {0}")]
    Command(String),

    /// The output could not be read as a memory figure.
    #[error("Could not parse telemetry output: {0}")]
    Parse(String),
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// A mechanism for reading used GPU memory.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Used memory on device 0, in MB.
    async fn used_memory_mb(&self) -> Result<u64>;
}

/// Parse the first line of `nvidia-smi` CSV output as MB.
pub fn parse_first_line(stdout: &str) -> Result<u64> {
    let first = stdout
        .trim()
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| TelemetryError::Parse("empty output".to_string()))?;
    first
        .parse::<u64>()
        .map_err(|e| TelemetryError::Parse(format!("'{first}': {e}")))
}

/// Reads memory by invoking `nvidia-smi`.
#[derive(Debug, Clone)]
pub struct ShellFallback {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ShellFallback {
    /// The standard `nvidia-smi` query with the given timeout.
    pub fn nvidia_smi(timeout: Duration) -> Self {
        Self {
            program: "nvidia-smi".to_string(),
            args: vec![
                "--query-gpu=memory.used".to_string(),
                "--format=csv,noheader,nounits".to_string(),
            ],
            timeout,
        }
    }

    /// Run an arbitrary command whose first stdout line is the MB figure.
    pub fn custom(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

impl Default for ShellFallback {
    fn default() -> Self {
        Self::nvidia_smi(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl TelemetrySource for ShellFallback {
    fn name(&self) -> &'static str {
        "nvidia-smi"
    }

    async fn used_memory_mb(&self) -> Result<u64> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| TelemetryError::Timeout(self.timeout))?
            .map_err(|e| TelemetryError::Command(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(TelemetryError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_first_line(&String::from_utf8_lossy(&output.stdout))
    }
}

/// NVML query against device 0, falling back to the shell per call.
#[cfg(feature = "nvml")]
pub struct NativeQuery {
    nvml: nvml_wrapper::Nvml,
    fallback: ShellFallback,
}

#[cfg(feature = "nvml")]
impl NativeQuery {
    /// Initialise NVML. Fails when the driver library cannot be loaded.
    pub fn probe(fallback: ShellFallback) -> Result<Self> {
        let nvml = nvml_wrapper::Nvml::init()
            .map_err(|e| TelemetryError::Unavailable(e.to_string()))?;
        Ok(Self { nvml, fallback })
    }

    fn query(&self) -> std::result::Result<u64, nvml_wrapper::error::NvmlError> {
        let device = self.nvml.device_by_index(0)?;
        let memory = device.memory_info()?;
        Ok(memory.used / (1024 * 1024))
    }
}

#[cfg(feature = "nvml")]
#[async_trait]
impl TelemetrySource for NativeQuery {
    fn name(&self) -> &'static str {
        "nvml"
    }

    async fn used_memory_mb(&self) -> Result<u64> {
        match self.query() {
            Ok(mb) => Ok(mb),
            Err(e) => {
                warn!(error = %e, "NVML memory query failed, trying nvidia-smi");
                self.fallback.used_memory_mb().await
            }
        }
    }
}

/// Source used when telemetry is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTelemetry;

#[async_trait]
impl TelemetrySource for DisabledTelemetry {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn used_memory_mb(&self) -> Result<u64> {
        Err(TelemetryError::Unavailable("telemetry disabled".to_string()))
    }
}

/// Settings for [`select_source`].
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Whether to read GPU memory at all.
    pub enabled: bool,
    /// Timeout for the shell query.
    pub command_timeout: Duration,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Pick the telemetry source once, at startup.
pub fn select_source(settings: &TelemetrySettings) -> Box<dyn TelemetrySource> {
    if !settings.enabled {
        info!("GPU telemetry disabled, memory deltas will be reported as unavailable");
        return Box::new(DisabledTelemetry);
    }

    native_or(ShellFallback::nvidia_smi(settings.command_timeout))
}

#[cfg(feature = "nvml")]
fn native_or(fallback: ShellFallback) -> Box<dyn TelemetrySource> {
    match NativeQuery::probe(fallback.clone()) {
        Ok(native) => {
            info!("NVML initialized, monitoring GPU memory");
            Box::new(native)
        }
        Err(e) => {
            warn!(error = %e, "NVML initialization failed, using nvidia-smi fallback");
            Box::new(fallback)
        }
    }
}

#[cfg(not(feature = "nvml"))]
fn native_or(fallback: ShellFallback) -> Box<dyn TelemetrySource> {
    info!("Built without NVML support, using nvidia-smi for GPU telemetry");
    Box::new(fallback)
}

/// Infallible front for a [`TelemetrySource`].
pub struct TelemetryReader {
    source: Box<dyn TelemetrySource>,
}

impl TelemetryReader {
    /// Wrap a source.
    pub fn new(source: Box<dyn TelemetrySource>) -> Self {
        Self { source }
    }

    /// Reader over the source chosen by [`select_source`].
    pub fn from_settings(settings: &TelemetrySettings) -> Self {
        Self::new(select_source(settings))
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Take one reading. Failures are logged and reported as unavailable.
    pub async fn read_memory_mb(&self) -> TelemetrySample {
        match self.source.used_memory_mb().await {
            Ok(mb) => TelemetrySample::Available(mb),
            Err(TelemetryError::Unavailable(_)) => TelemetrySample::Unavailable,
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "GPU memory read failed");
                TelemetrySample::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ShellFallback {
        ShellFallback::custom("sh", ["-c", script], timeout)
    }

    #[test]
    fn test_parse_first_line() {
        assert_eq!(parse_first_line("5120\n").unwrap(), 5120);
        assert_eq!(parse_first_line("  812 \n2048\n").unwrap(), 812);
        assert!(matches!(parse_first_line(""), Err(TelemetryError::Parse(_))));
        assert!(matches!(
            parse_first_line("[N/A]\n"),
            Err(TelemetryError::Parse(_))
        ));
        assert!(matches!(parse_first_line("-3\n"), Err(TelemetryError::Parse(_))));
    }

    #[tokio::test]
    async fn test_shell_reads_first_line() {
        let source = sh("echo 1234; echo 99", Duration::from_secs(5));
        assert_eq!(source.used_memory_mb().await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn test_shell_times_out() {
        let source = sh("sleep 5", Duration::from_millis(100));
        let err = source.used_memory_mb().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_shell_nonzero_exit_is_command_error() {
        let source = sh("echo 10; exit 3", Duration::from_secs(5));
        let err = source.used_memory_mb().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Command(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_command_error() {
        let source = ShellFallback::custom(
            "codebench-no-such-binary",
            Vec::<String>::new(),
            Duration::from_secs(1),
        );
        let err = source.used_memory_mb().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Command(_)));
    }

    #[tokio::test]
    async fn test_reader_degrades_to_unavailable() {
        let reader = TelemetryReader::new(Box::new(sh("echo garbage", Duration::from_secs(5))));
        assert_eq!(reader.read_memory_mb().await, TelemetrySample::Unavailable);

        let reader = TelemetryReader::new(Box::new(DisabledTelemetry));
        assert_eq!(reader.read_memory_mb().await, TelemetrySample::Unavailable);
        assert_eq!(reader.source_name(), "disabled");
    }

    #[tokio::test]
    async fn test_reader_passes_through_readings() {
        let reader = TelemetryReader::new(Box::new(sh("echo 2048", Duration::from_secs(5))));
        assert_eq!(reader.read_memory_mb().await, TelemetrySample::Available(2048));
    }

    #[test]
    fn test_select_source_disabled() {
        let settings = TelemetrySettings {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(select_source(&settings).name(), "disabled");
    }
}

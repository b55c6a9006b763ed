//! Layered run configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file
//! (`codebench.toml` or `--config`), `CODEBENCH_*` environment variables,
//! then command-line flags. Nested keys use `__` in variable names, e.g.
//! `CODEBENCH_BACKEND__URL`.

use config::{Config, ConfigError, Environment, File, Map};
use llm_codebench_adapters::backend::{ApiFlavor, DEFAULT_BACKEND_URL};
use llm_codebench_adapters::sandbox::DEFAULT_INTERPRETER;
use llm_codebench_adapters::telemetry::TelemetrySettings;
use llm_codebench_benchmarks::io::{OutputFormat, DEFAULT_CSV_FILE};
use llm_codebench_benchmarks::BenchmarkSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "codebench";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CODEBENCH";

/// Models evaluated when none are configured.
pub const DEFAULT_MODELS: [&str; 12] = [
    "codellama:7b",
    "codellama:13b",
    "deepseek-coder-v2:16b",
    "deepseek-coder:6.7b",
    "deepseek-r1:14b",
    "llama3.2:latest",
    "qwen2.5-coder:14b",
    "qwen2.5-coder:latest",
    "qwen3:14b",
    "qwen3-coder:30b",
    "yi:9b",
    "yi-coder:9b",
];

/// Everything a benchmark run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model ids, evaluated in order.
    pub models: Vec<String>,
    /// Tasks per model; 0 runs the whole corpus.
    pub sample_limit: usize,
    /// JSON Lines task corpus.
    pub corpus_path: PathBuf,
    /// Pause after every request, in milliseconds.
    pub request_delay_ms: u64,
    /// Call `check(<entry_point>)` after the test fragment.
    pub invoke_check: bool,
    /// Model server.
    pub backend: BackendSettings,
    /// Verification subprocess.
    pub verifier: VerifierSettings,
    /// GPU memory telemetry.
    pub telemetry: TelemetryConfig,
    /// Result files.
    pub output: OutputSettings,
}

/// `[backend]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Server base URL.
    pub url: String,
    /// Wire protocol.
    pub flavor: ApiFlavor,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// `[verifier]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierSettings {
    /// Interpreter invoked as `<interpreter> -c <program>`.
    pub interpreter: String,
    /// Hard timeout in seconds.
    pub timeout_secs: u64,
}

/// `[telemetry]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Read GPU memory at all.
    pub enabled: bool,
    /// Timeout for `nvidia-smi`, in seconds.
    pub command_timeout_secs: u64,
}

/// `[output]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// CSV path; other formats are written next to it.
    pub path: PathBuf,
    /// Which files to write.
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            sample_limit: 3,
            corpus_path: PathBuf::from("HumanEval.jsonl"),
            request_delay_ms: 3000,
            invoke_check: false,
            backend: BackendSettings::default(),
            verifier: VerifierSettings::default(),
            telemetry: TelemetryConfig::default(),
            output: OutputSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            flavor: ApiFlavor::default(),
            timeout_secs: 600,
        }
    }
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command_timeout_secs: 5,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CSV_FILE),
            format: OutputFormat::default(),
        }
    }
}

impl Settings {
    /// Load from defaults, the config file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, None)
    }

    /// Like [`Settings::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("models")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Orchestrator knobs.
    pub fn benchmark_settings(&self) -> BenchmarkSettings {
        BenchmarkSettings {
            request_delay: Duration::from_millis(self.request_delay_ms),
            invoke_check: self.invoke_check,
        }
    }

    /// Telemetry source selection.
    pub fn telemetry_settings(&self) -> TelemetrySettings {
        TelemetrySettings {
            enabled: self.telemetry.enabled,
            command_timeout: Duration::from_secs(self.telemetry.command_timeout_secs),
        }
    }

    /// Backend request timeout.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Verification timeout.
    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier.timeout_secs)
    }
}

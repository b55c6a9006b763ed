//! CLI for LLM Codebench.
//!
//! `codebench run` evaluates the configured models on the task corpus and
//! writes the results; `codebench status` shows the resolved configuration
//! and a single GPU memory reading.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod settings;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use llm_codebench_adapters::backend::{ApiFlavor, HttpChatClient};
use llm_codebench_adapters::sandbox::Verifier;
use llm_codebench_adapters::telemetry::TelemetryReader;
use llm_codebench_benchmarks::io::{self, OutputFormat};
use llm_codebench_benchmarks::{render_comparison_table, Benchmark, ConsoleReporter};
use llm_codebench_core::{TaskCorpus, TelemetrySample};
use settings::Settings;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// LLM Codebench CLI.
#[derive(Parser, Debug)]
#[command(name = "codebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark every configured model on the task corpus.
    ///
    /// Progress is printed per task, followed by a comparison table. The
    /// CSV (and any extra formats) are written after the last model.
    Run(RunArgs),

    /// Show configuration and a GPU memory reading.
    Status {
        /// Configuration file.
        #[arg(short, long, env = "CODEBENCH_CONFIG")]
        config: Option<PathBuf>,

        /// Also print the fully resolved configuration.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Flags for `codebench run`. Each one overrides the layered configuration.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file.
    #[arg(short, long, env = "CODEBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma-separated model ids.
    #[arg(short, long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Tasks per model; 0 runs the whole corpus.
    #[arg(short = 'n', long)]
    pub sample_limit: Option<usize>,

    /// JSON Lines task corpus.
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Model server base URL.
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Backend wire protocol: ollama or openai.
    #[arg(long)]
    pub flavor: Option<ApiFlavor>,

    /// Interpreter used to run generated code.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// CSV output path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output formats: csv, json, markdown or all.
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Pause after each request, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Call `check(<entry_point>)` after each test fragment.
    #[arg(long)]
    pub invoke_check: bool,

    /// Skip GPU memory telemetry.
    #[arg(long)]
    pub no_gpu: bool,
}

impl RunArgs {
    /// Apply flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(models) = &self.models {
            settings.models = models.clone();
        }
        if let Some(limit) = self.sample_limit {
            settings.sample_limit = limit;
        }
        if let Some(corpus) = &self.corpus {
            settings.corpus_path = corpus.clone();
        }
        if let Some(url) = &self.backend_url {
            settings.backend.url = url.clone();
        }
        if let Some(flavor) = self.flavor {
            settings.backend.flavor = flavor;
        }
        if let Some(interpreter) = &self.interpreter {
            settings.verifier.interpreter = interpreter.clone();
        }
        if let Some(output) = &self.output {
            settings.output.path = output.clone();
        }
        if let Some(format) = self.format {
            settings.output.format = format;
        }
        if let Some(delay) = self.delay_ms {
            settings.request_delay_ms = delay;
        }
        if self.invoke_check {
            settings.invoke_check = true;
        }
        if self.no_gpu {
            settings.telemetry.enabled = false;
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Load the `.env` file, then parse `args`.
///
/// `env_file` overrides the default `.env` lookup in the working directory.
/// Variables already set in the process are never overwritten.
pub fn parse_args<I, T>(env_file: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::try_parse_from(args)
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails.
pub fn run() -> anyhow::Result<()> {
    let cli = parse_args(None, std::env::args_os()).unwrap_or_else(|e| e.exit());
    init_tracing(cli.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(dispatch(cli.command))
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => {
            let mut settings =
                Settings::load(args.config.as_deref()).context("failed to load configuration")?;
            args.apply(&mut settings);
            run_benchmark(&settings).await
        }
        Commands::Status { config, detailed } => {
            let settings =
                Settings::load(config.as_deref()).context("failed to load configuration")?;
            show_status(&settings, detailed).await
        }
    }
}

async fn run_benchmark(settings: &Settings) -> anyhow::Result<()> {
    let corpus = TaskCorpus::load(&settings.corpus_path)
        .with_context(|| format!("failed to load corpus {}", settings.corpus_path.display()))?;

    let backend = HttpChatClient::new(
        &settings.backend.url,
        settings.backend.flavor,
        settings.backend_timeout(),
    )
    .context("failed to build backend client")?;
    let telemetry = TelemetryReader::from_settings(&settings.telemetry_settings());
    let verifier = Verifier::new(settings.verifier.interpreter.clone(), settings.verifier_timeout());

    info!(
        backend = %backend.endpoint(),
        telemetry = telemetry.source_name(),
        interpreter = verifier.interpreter(),
        "Benchmark configured"
    );

    let report = Benchmark::new(&backend, &telemetry, &verifier)
        .with_settings(settings.benchmark_settings())
        .run(
            &settings.models,
            &corpus,
            settings.sample_limit,
            &mut ConsoleReporter,
        )
        .await?;

    println!();
    print!("{}", render_comparison_table(report.summaries()));

    let written = io::write_outputs(&report, &settings.output.path, settings.output.format)
        .with_context(|| format!("failed to write {}", settings.output.path.display()))?;
    println!();
    for path in written {
        println!("Results written to {}", path.display());
    }

    Ok(())
}

async fn show_status(settings: &Settings, detailed: bool) -> anyhow::Result<()> {
    println!("LLM Codebench");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Backend: {} ({})", settings.backend.url, settings.backend.flavor);
    println!("Models: {}", settings.models.join(", "));
    println!("Corpus: {}", settings.corpus_path.display());

    let telemetry = TelemetryReader::from_settings(&settings.telemetry_settings());
    match telemetry.read_memory_mb().await {
        TelemetrySample::Available(mb) => {
            println!("GPU memory used: {mb} MB (via {})", telemetry.source_name())
        }
        TelemetrySample::Unavailable => {
            println!("GPU memory used: unavailable (via {})", telemetry.source_name())
        }
    }

    if detailed {
        let resolved = toml::to_string_pretty(settings).context("failed to render configuration")?;
        println!("\nResolved configuration:\n{resolved}");
    }

    Ok(())
}

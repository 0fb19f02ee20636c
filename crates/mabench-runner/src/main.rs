use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use mabench_runner::{renderer::render_result_as_tree, run_benchmarks, GroundTruthPolicies, RunConfig};
use opentelemetry::global::{self};
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_sdk::Resource;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, subscriber, warn};
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// A command-line runner for the MA-Bench airline benchmark.
///
/// Runs every task with the ground-truth agent, which is how task files are
/// validated end to end.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a task YAML file or a directory of tasks. Defaults to `MABENCH_TASKS_DIR`.
    path: Option<PathBuf>,

    /// Agent turn budget of every run.
    #[arg(long)]
    max_turns: Option<u32>,

    /// Runs executed in parallel.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Timeout of a single policy call, in seconds.
    #[arg(long)]
    call_timeout: Option<u64>,

    /// Wall-clock budget of the whole sweep, in seconds.
    #[arg(long)]
    sweep_timeout: Option<u64>,

    /// Print the results as JSON instead of trees.
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Command-line flags take precedence over the environment.
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::from_env();
        if let Some(path) = &self.path {
            config.tasks_dir = path.clone();
        }
        if let Some(max_turns) = self.max_turns {
            config.max_turns = max_turns;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(seconds) = self.call_timeout {
            config.call_timeout = Duration::from_secs(seconds);
        }
        if let Some(seconds) = self.sweep_timeout {
            config.sweep_timeout = Some(Duration::from_secs(seconds));
        }
        config
    }
}

/// Initializes the OpenTelemetry pipeline for tracing.
fn init_tracing() -> Result<sdktrace::SdkTracerProvider> {
    let provider = sdktrace::SdkTracerProvider::builder()
        .with_resource(Resource::builder().with_service_name("mabench-runner").build())
        .build();
    let tracer = provider.tracer("mabench-runner");
    global::set_tracer_provider(provider.clone());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mabench_lib=debug,mabench_runner=debug"));
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    subscriber::set_global_default(subscriber)
        .context("Failed to set global default tracing subscriber")?;

    Ok(provider)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let tracer_provider = init_tracing()?;

    let cli = Cli::parse();
    let config = cli.run_config();
    config.validate().context("Invalid run configuration")?;
    info!(path = %config.tasks_dir.display(), ?config, "Starting benchmark sweep");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight runs");
            ctrl_c.cancel();
        }
    });

    let results = run_benchmarks(
        &config.tasks_dir,
        Arc::new(GroundTruthPolicies),
        &config,
        cancel,
    )
    .await?;

    if results.is_empty() {
        println!("No tasks found at {}.", config.tasks_dir.display());
    } else if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!("{}", render_result_as_tree(result)?);
        }
    }

    let passed = results.iter().filter(|r| r.succeeded()).count();
    let mean = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.reward.reward).sum::<f64>() / results.len() as f64
    };
    info!(passed, total = results.len(), mean_reward = mean, "Sweep finished");

    tracer_provider.shutdown()?;
    Ok(())
}

//! Binary entry point for the CQL throughput benchmark.
#![forbid(unsafe_code)]

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use cqlbench::{
    backend::{Backend, ConnectOptions, MemoryBackend, ScyllaBackend},
    config::{BackendKind, BenchConfig, ConfigOverrides, FileConfig},
    logging, Benchmark, Phase, Workload,
};

#[derive(Parser, Debug)]
#[command(
    name = "cqlbench",
    version,
    about = "Drive a fixed number of inserts/selects against a CQL cluster and time it"
)]
struct Cli {
    #[arg(
        long,
        value_name = "HOST:PORT,...",
        env = "CQLBENCH_NODES",
        help = "Addresses of database nodes to connect to separated by a comma"
    )]
    nodes: Option<String>,

    #[arg(long, value_enum, ignore_case = true, help = "Type of work to perform")]
    workload: Option<Workload>,

    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Total number of keys to process; a mixed run issues two requests per key"
    )]
    tasks: Option<i64>,

    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Maximum number of requests performed at once"
    )]
    concurrency: Option<i64>,

    #[arg(
        long = "skip-setup",
        visible_alias = "dont-prepare",
        help = "Don't create tables and insert into them before the benchmark"
    )]
    skip_setup: bool,

    #[arg(long, value_name = "MS", help = "Per-request timeout")]
    request_timeout_ms: Option<u64>,

    #[arg(long, value_enum, help = "Where requests are sent")]
    backend: Option<BackendKind>,

    #[arg(
        long,
        value_name = "FILE",
        env = "CQLBENCH_CONFIG",
        help = "TOML file with default settings"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILTER",
        help = "Tracing filter directive (defaults to RUST_LOG, then info)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for the final report"
    )]
    format: OutputFormat,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            nodes: self.nodes.clone(),
            workload: self.workload.map(|w| w.as_str().to_string()),
            tasks: self.tasks,
            concurrency: self.concurrency,
            skip_setup: self.skip_setup.then_some(true),
            request_timeout_ms: self.request_timeout_ms,
            backend: self.backend,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let outcome = tokio::select! {
        result = run() => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted: benchmark aborted, no measurement taken");
            std::process::exit(130);
        }
    };
    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().or(file.log_level.as_deref());
    logging::init_logging(level)?;

    let config = BenchConfig::resolve(&file, &cli.overrides())?;
    if cli.format == OutputFormat::Text {
        println!("Benchmark configuration: {config:#?}");
    }

    match config.backend {
        BackendKind::Scylla => {
            let mut opts = ConnectOptions::new(config.node_addresses.clone());
            opts.request_timeout = config.request_timeout;
            let backend = ScyllaBackend::connect(&opts).await?;
            execute(config, backend, cli.format).await
        }
        BackendKind::Memory => execute(config, MemoryBackend::new(), cli.format).await,
    }
}

async fn execute<B: Backend>(
    config: BenchConfig,
    backend: B,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let text = format == OutputFormat::Text;
    let bench = Benchmark::new(config, Arc::new(backend))?;
    let report = bench
        .run_with_progress(|phase| match phase {
            Phase::Prepopulate if text => {
                println!("Preparing a selects benchmark (inserting values)...")
            }
            Phase::Timed if text => println!("Starting the benchmark"),
            _ => {}
        })
        .await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => report.write_text(&mut out)?,
        OutputFormat::Json => report.write_json(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

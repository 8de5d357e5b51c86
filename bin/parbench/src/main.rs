//! ---
//! pb_section: "05-external-interfaces"
//! pb_subsection: "binary"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Binary entrypoint for the parbench harness and its workers."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parbench_common::{init_tracing, BenchConfig, LogFormat, LoggingConfig, StrategyKind};
use parbench_harness::{
    build_strategy, exit_code_for, run_worker, Harness, RunReport, WorkerCommand, WorkerPayload,
};
use parbench_metrics::{new_registry, write_text_file, HarnessMetrics};
use parbench_workloads::{FlushPolicy, TracingReporter, WorkloadSpec};
use tracing::{error, info};

mod cli;

use cli::Selection;

/// Exit status when `--strict` is set and at least one unit failed.
const EXIT_UNITS_FAILED: u8 = 3;

const CONFIG_CANDIDATES: [&str; 2] = ["parbench.toml", "configs/parbench.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run a synthetic workload on N concurrent processes or threads",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Worker type: cpu, mem or io. Prompts interactively when omitted.
    #[arg(value_name = "KIND", requires = "count")]
    kind: Option<String>,

    /// Number of concurrent units (at least 2).
    #[arg(value_name = "COUNT")]
    count: Option<String>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Configuration file; defaults to parbench.toml or PARBENCH_CONFIG.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How units are hosted: isolated (processes) or shared (threads).
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<StrategyKind>,

    /// Exit with status 3 when any unit failed.
    #[arg(long)]
    strict: bool,

    /// Directory for the I/O workload's files.
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Override the per-unit iteration count.
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,

    /// I/O flush policy: data (sync to device) or kernel (flush to the OS only).
    #[arg(long, value_name = "POLICY")]
    flush: Option<FlushPolicy>,

    /// Force a resource acquisition failure in this unit; repeatable.
    #[arg(long = "inject-fault", value_name = "INDEX")]
    inject_faults: Vec<usize>,

    /// Write the JSON run report to this file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Write the Prometheus text exposition to this file.
    #[arg(long = "metrics-out", value_name = "FILE")]
    metrics_out: Option<PathBuf>,

    /// Log format on stderr: pretty or structured-json.
    #[arg(long = "log-format", value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one unit in this process; used by the isolated strategy.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Debug, Args)]
struct WorkerArgs {
    #[arg(long, value_name = "JSON")]
    payload: String,

    #[arg(long = "log-format", value_name = "FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Worker(args)) => Ok(worker_main(args)),
        None => run_main(cli.kind, cli.count, cli.run),
    }
}

fn worker_main(args: WorkerArgs) -> ExitCode {
    let logging = LoggingConfig {
        format: args.log_format,
        ..LoggingConfig::default()
    };
    if let Err(err) = init_tracing("parbench-worker", &logging) {
        eprintln!("failed to initialise worker logging: {err:#}");
    }

    let payload = match WorkerPayload::decode(&args.payload) {
        Ok(payload) => payload,
        Err(err) => {
            error!(error = %err, "unreadable worker payload");
            return ExitCode::FAILURE;
        }
    };
    match run_worker(&payload, &TracingReporter) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(exit_code_for(&err) as u8),
    }
}

fn run_main(kind: Option<String>, count: Option<String>, args: RunArgs) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => BenchConfig::from_path(path)?,
        None => BenchConfig::load_with_source(&CONFIG_CANDIDATES)?.config,
    };
    apply_overrides(&mut config, &args);
    config.validate()?;
    init_tracing("parbench", &config.logging)?;

    let selection = match (kind, count) {
        (Some(kind), Some(count)) => Selection::parse(&kind, &count)?,
        _ => {
            let stdin = io::stdin();
            cli::prompt_selection(&mut stdin.lock(), &mut io::stdout())?
        }
    };
    let spec = match args.iterations {
        Some(iterations) => WorkloadSpec::new(selection.kind, iterations)?,
        None => WorkloadSpec::from_settings(selection.kind, &config.workload)?,
    };

    let strategy_kind = config.harness.strategy;
    let worker = match strategy_kind {
        StrategyKind::Isolated => Some(
            WorkerCommand::current_exe()
                .context("unable to locate the parbench executable")?
                .arg("--log-format")
                .arg(config.logging.format.as_str()),
        ),
        StrategyKind::Shared => None,
    };
    let strategy = build_strategy(
        strategy_kind,
        config.workload.clone(),
        Arc::new(TracingReporter),
        worker,
    )?;

    let metrics = HarnessMetrics::new(new_registry())?;
    let harness = Harness::new(strategy)
        .with_faults(config.harness.inject_faults.iter().copied())
        .with_metrics(metrics.clone());

    println!(
        "Creating {} units with '{}' worker...",
        selection.count,
        selection.kind.token()
    );
    io::stdout().flush().context("failed to flush stdout")?;
    let report = harness.run(spec, selection.count)?;
    print_summary(&report)?;

    if let Some(path) = &config.metrics.report_path {
        report.write_json(path)?;
    }
    if let Some(path) = &config.metrics.prometheus_path {
        write_text_file(&metrics.registry(), path)?;
        info!(path = %path.display(), "metrics written");
    }

    if config.harness.fail_on_unit_error && !report.is_success() {
        return Ok(ExitCode::from(EXIT_UNITS_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Command-line flags win over file values.
fn apply_overrides(config: &mut BenchConfig, args: &RunArgs) {
    if let Some(strategy) = args.strategy {
        config.harness.strategy = strategy;
    }
    if args.strict {
        config.harness.fail_on_unit_error = true;
    }
    if let Some(dir) = &args.output_dir {
        config.workload.io.output_dir = dir.clone();
    }
    if let Some(flush) = args.flush {
        config.workload.io.flush = flush;
    }
    if !args.inject_faults.is_empty() {
        config.harness.inject_faults = args.inject_faults.clone();
    }
    if let Some(path) = &args.report {
        config.metrics.report_path = Some(path.clone());
    }
    if let Some(path) = &args.metrics_out {
        config.metrics.prometheus_path = Some(path.clone());
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
}

fn print_summary(report: &RunReport) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "All {} units finished ({} strategy, '{}' worker, {} iterations)",
        report.units,
        report.strategy,
        report.spec.kind.token(),
        report.spec.iterations
    )?;
    writeln!(
        out,
        "Succeeded: {}  Failed: {}  Elapsed: {:.3}s",
        report.succeeded(),
        report.failed(),
        report.elapsed_seconds
    )?;
    for result in report.results.iter().filter(|r| !r.success) {
        let reason = result
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown failure".to_owned());
        writeln!(
            out,
            "  unit {} ({}): {}",
            result.index,
            result.handle.as_deref().unwrap_or("not started"),
            reason
        )?;
    }
    out.flush()?;
    Ok(())
}

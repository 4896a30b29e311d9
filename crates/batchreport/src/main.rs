use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use batchreport::config::{load_config, load_jobs, validate_config, RunConfig};
use batchreport::logging::{init_tracing, LogFormat};
use batchreport::{
    by_field, partition, BatchError, DispatchSummary, Dispatcher, LogProgress, ManifestWriter,
    UnmappedPolicy,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

/// Dispatch report generators over a job list and record which jobs failed
#[derive(Parser)]
#[command(name = "batchreport", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured pipeline and write the manifests
    Run(RunArgs),
    /// Validate the config and job list without running anything
    Check {
        /// Path to the run configuration (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to the run configuration (JSON or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Number of worker threads (overrides the config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Jobs per generator invocation (overrides the config)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// What to do with jobs whose category has no pipeline
    #[arg(long)]
    on_unmapped: Option<UnmappedPolicy>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_format) {
        eprintln!("batchreport: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Check { config } => check(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            warn!("Run cancelled; manifests hold the jobs finished so far");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: RunArgs) -> Result<(), BatchError> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    validate_config(&config)?;

    let jobs = load_jobs(&config.jobs)?;
    let table = config.partition_table();
    let dispatcher = Dispatcher::new(config.dispatch.clone(), config.shared_options())
        .with_progress(Arc::new(LogProgress));

    let cancel = dispatcher.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling remaining chunks...");
        cancel.cancel();
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let mut manifests =
        ManifestWriter::open(&config.manifests.successes, &config.manifests.failures)?;
    info!(
        jobs = jobs.len(),
        pipelines = table.len(),
        workers = config.dispatch.worker_count,
        chunk_size = config.dispatch.chunk_size,
        "starting run"
    );

    let summary = dispatcher.dispatch_jobs(
        &mut manifests,
        &jobs,
        by_field(&config.jobs.category_column),
        &table,
    )?;

    info!(
        run_id = %summary.run_id,
        jobs = summary.total_jobs(),
        failed = summary.failed_jobs(),
        elapsed_ms = summary.elapsed().num_milliseconds(),
        "run complete"
    );

    if let Some(path) = &args.summary {
        write_summary(path, &summary)?;
    }
    Ok(())
}

fn apply_overrides(config: &mut RunConfig, args: &RunArgs) {
    if let Some(workers) = args.workers {
        config.dispatch.worker_count = workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.dispatch.chunk_size = chunk_size;
    }
    if let Some(policy) = args.on_unmapped {
        config.dispatch.on_unmapped_category = policy;
    }
}

fn check(config_path: &Path) -> Result<(), BatchError> {
    let config = load_config(config_path)?;
    let jobs = load_jobs(&config.jobs)?;
    let table = config.partition_table();

    let partitioning = partition(
        &jobs,
        by_field(&config.jobs.category_column),
        &table,
        config.dispatch.on_unmapped_category,
    )?;

    for part in &partitioning.partitions {
        println!(
            "{}\t{}\t{} job(s)\t{} stage(s)",
            part.category,
            part.pipeline.name(),
            part.ids.len(),
            part.pipeline.len()
        );
    }
    if !partitioning.unmapped.is_empty() {
        println!("(unmapped)\t-\t{} job(s)", partitioning.unmapped.len());
    }
    info!("Config '{}' is valid", config_path.display());
    Ok(())
}

fn write_summary(path: &Path, summary: &DispatchSummary) -> Result<(), BatchError> {
    let write_err = |source| BatchError::WriteSummary {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    serde_json::to_writer_pretty(&mut writer, summary).map_err(|e| write_err(e.into()))?;
    writer.flush().map_err(write_err)
}

//! AutoDocs worker - uploads code archives and processes them to completion.
//!
//! 1. Load settings (JSON file and/or environment)
//! 2. Start the worker pool
//! 3. Upload the given files, or run the requested operator action
//! 4. Wait until every touched job settles and print it as JSON

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use autodocs::api::{ApiResponse, AutoDocs};
use autodocs::broadcast::JobEventBroadcaster;
use autodocs::config::load_settings_with_env;
use autodocs::db::Database;
use autodocs::error::{AutoDocsError, WorkerError};
use autodocs::logging::{init_logging, LogFormat};
use autodocs::pipeline::PipelineConfig;
use autodocs::worker::{JobQueue, WorkerPool};

#[derive(Parser, Debug)]
#[command(name = "autodocs-worker")]
#[command(about = "Generate documentation artifacts for uploaded code archives")]
struct Args {
    /// Settings file (JSON). Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format: text or json
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Re-enqueue an existing job by id
    #[arg(long)]
    requeue: Vec<String>,

    /// Re-enqueue every job whose artifacts still hold placeholder text
    #[arg(long)]
    reprocess_placeholders: bool,

    /// Print provider configuration status and exit
    #[arg(long)]
    provider_status: bool,

    /// Code archives (or single files) to document
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("autodocs-worker: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, AutoDocsError> {
    init_logging(args.log_format)?;

    let settings = Arc::new(load_settings_with_env(args.config.as_deref())?);
    info!(
        "Starting AutoDocs worker v{} ({})",
        env!("CARGO_PKG_VERSION"),
        settings.environment
    );

    let db = Database::open(Path::new(&settings.database_path))?;
    let config = Arc::new(PipelineConfig::from_settings(&settings)?);
    let events = JobEventBroadcaster::default();
    let pool = Arc::new(WorkerPool::new(
        config,
        db.clone(),
        settings.worker_count,
        Some(events),
    )?);
    let queue: Arc<dyn JobQueue> = pool.clone();
    let api = AutoDocs::new(Arc::clone(&settings), db, queue);

    if args.provider_status {
        print_json(&api.provider_status());
        drop(api);
        shutdown_pool(pool);
        return Ok(ExitCode::SUCCESS);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .map_err(|e| WorkerError::SpawnFailed(format!("signal handler: {}", e)))?;
    }

    let mut pending: HashSet<String> = HashSet::new();
    let mut failures = 0usize;

    for path in &args.files {
        match upload_file(&api, path) {
            Ok(job_id) => {
                pending.insert(job_id);
            }
            Err(message) => {
                error!("{}", message);
                failures += 1;
            }
        }
    }

    for job_id in &args.requeue {
        match api.requeue(job_id) {
            Ok(job) => {
                pending.insert(job.id);
            }
            Err(e) => {
                error!("Could not requeue {}: {}", job_id, e);
                failures += 1;
            }
        }
    }

    if args.reprocess_placeholders {
        match api.reprocess_placeholders() {
            Ok(result) => pending.extend(result.reprocessed),
            Err(e) => {
                error!("Could not reprocess placeholders: {}", e);
                failures += 1;
            }
        }
    }

    if pending.is_empty() && failures == 0 {
        print_json(&ApiResponse::from(api.list_jobs()));
        drop(api);
        shutdown_pool(pool);
        return Ok(ExitCode::SUCCESS);
    }

    let job_ids: Vec<String> = pending.iter().cloned().collect();
    while !pending.is_empty() && !interrupted.load(Ordering::Relaxed) {
        let Some(report) = pool.recv_result_timeout(Duration::from_millis(250)) else {
            continue;
        };
        if report.outcome.is_final() {
            info!("Job {} settled: {:?}", report.job_id, report.outcome);
            pending.remove(&report.job_id);
        }
    }

    if interrupted.load(Ordering::Relaxed) {
        warn!("Interrupted with {} jobs unfinished", pending.len());
    }

    for job_id in &job_ids {
        print_json(&ApiResponse::from(api.get_job(job_id)));
    }

    drop(api);
    shutdown_pool(pool);

    Ok(if failures == 0 && pending.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn upload_file(api: &AutoDocs, path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let job = api
        .upload(&name, &bytes)
        .map_err(|e| format!("Upload of {} failed: {}", path.display(), e))?;
    info!("Queued {} as job {}", job.filename, job.id);
    Ok(job.id)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

fn shutdown_pool(pool: Arc<WorkerPool>) {
    match Arc::try_unwrap(pool) {
        Ok(pool) => pool.wait(),
        Err(pool) => pool.shutdown(),
    }
}

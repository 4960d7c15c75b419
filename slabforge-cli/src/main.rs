//! Slabforge CLI - split, render, recombine.
//!
//! Runs one render job end to end against the bundled local executor: the
//! job directory supplies `scene.json` and the render program, intermediate
//! slab rasters land under the working directory, and the recombined
//! composite is written at the end. Ctrl-C aborts the wait cleanly without
//! writing output.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use slabforge::app::{self, JobConfig};
use slabforge::executor::{LocalExecutor, LocalExecutorConfig};

#[derive(Debug, Parser)]
#[command(name = "slabforge", version, about = "Distributed slab rendering driver")]
struct Args {
    /// Job directory holding scene.json and the render program.
    #[arg(long, default_value = "job")]
    job_path: PathBuf,

    /// Root directory for intermediate slab output.
    #[arg(long, default_value = "working_dir")]
    working_dir: PathBuf,

    /// Path for the final composite image.
    #[arg(long, default_value = "render.png")]
    output: PathBuf,

    /// Full image width in pixels.
    #[arg(long, default_value_t = app::DEFAULT_IMAGE_WIDTH)]
    image_width: u32,

    /// Full image height in pixels.
    #[arg(long, default_value_t = app::DEFAULT_IMAGE_HEIGHT)]
    image_height: u32,

    /// Slab edge length in pixels.
    #[arg(long, default_value_t = app::DEFAULT_SLAB_DIM)]
    slab_dim: u32,

    /// Render program to invoke for each slab, relative to the job
    /// directory.
    #[arg(long, default_value = "./render.sh")]
    program: String,

    /// Seconds between progress reports while waiting.
    #[arg(long, default_value_t = app::DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Seconds to wait for job completion before giving up; 0 waits
    /// forever.
    #[arg(long, default_value_t = app::DEFAULT_COMPLETION_TIMEOUT_SECS)]
    timeout: u64,

    /// Concurrent render processes.
    #[arg(long, default_value_t = slabforge::executor::DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("interrupt received; aborting wait");
        interrupt.cancel();
    }) {
        error!(error = %e, "failed to install interrupt handler");
        return ExitCode::FAILURE;
    }

    let config = JobConfig::new(args.job_path, args.working_dir)
        .with_dimensions(args.image_width, args.image_height)
        .with_slab_dim(args.slab_dim)
        .with_program(args.program)
        .with_composite_path(args.output)
        .with_poll_interval(Duration::from_secs(args.poll_interval.max(1)))
        .with_completion_timeout((args.timeout > 0).then(|| Duration::from_secs(args.timeout)))
        .with_max_concurrency(args.concurrency.max(1));

    let executor = Arc::new(LocalExecutor::with_config(LocalExecutorConfig {
        max_concurrency: config.max_concurrency,
    }));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to create runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(app::run_job(executor, &config, cancel)) {
        Ok(Some(summary)) => {
            info!(
                job = %summary.job_id,
                slabs = summary.slab_count,
                composite = %summary.composite_path.display(),
                "render job finished"
            );
            ExitCode::SUCCESS
        }
        Ok(None) => {
            // Interrupt is a clean abort, not a failure.
            info!("render job aborted");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "render job failed");
            ExitCode::FAILURE
        }
    }
}

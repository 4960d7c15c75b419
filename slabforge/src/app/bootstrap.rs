//! End-to-end job orchestration.
//!
//! [`run_job`] wires the pipeline together in its fixed order: load the
//! scene document, plan the slab grid, drive the job through the executor,
//! and recombine the collected slab output into the composite. Planning and
//! scene errors abort before anything is submitted, so a failed startup
//! never leaves a partial job behind.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AppError, JobConfig};
use crate::compose;
use crate::driver::JobDriver;
use crate::executor::{Executor, JobId};
use crate::plan;
use crate::scene::SceneParams;

/// Summary of a completed job run.
#[derive(Debug)]
pub struct RunSummary {
    /// Executor-assigned job id.
    pub job_id: JobId,

    /// Number of slabs rendered and recombined.
    pub slab_count: usize,

    /// Where the composite raster was written.
    pub composite_path: PathBuf,
}

/// Runs one render job end to end against the given executor.
///
/// Returns `Ok(Some(summary))` on success, or `Ok(None)` if `cancel` fired
/// while waiting for the executor, a clean abort that skips output writing
/// and recombination.
///
/// # Errors
///
/// Returns [`AppError`] for planning, scene, driver, or recombination
/// failures.
pub async fn run_job<E: Executor>(
    executor: Arc<E>,
    config: &JobConfig,
    cancel: CancellationToken,
) -> Result<Option<RunSummary>, AppError> {
    let scene_path = config.job_path.join("scene.json");
    let scene = SceneParams::from_file(&scene_path)?;
    if (scene.image_width, scene.image_height) != (config.image_width, config.image_height) {
        warn!(
            scene_width = scene.image_width,
            scene_height = scene.image_height,
            config_width = config.image_width,
            config_height = config.image_height,
            "scene document dimensions differ from job configuration; using configuration"
        );
    }

    let slabs = plan::partition(config.image_width, config.image_height, config.slab_dim)?;
    info!(
        slab_count = slabs.len(),
        width = config.image_width,
        height = config.image_height,
        slab_dim = config.slab_dim,
        "slab grid planned"
    );

    let driver = JobDriver::new(executor, config.clone());
    let Some(outcome) = driver.run(&slabs, &scene, cancel).await? else {
        info!("render job aborted before completion");
        return Ok(None);
    };

    let stats = compose::combine(
        &outcome.slab_files,
        config.image_width,
        config.image_height,
        &config.composite_path,
    )?;
    info!(
        job = %outcome.job_id,
        slabs = stats.slab_count,
        composite = %config.composite_path.display(),
        "composite written"
    );

    Ok(Some(RunSummary {
        job_id: outcome.job_id,
        slab_count: stats.slab_count,
        composite_path: config.composite_path.clone(),
    }))
}

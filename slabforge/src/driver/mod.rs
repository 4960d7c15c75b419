//! Job lifecycle against the executor collaborator.
//!
//! [`JobDriver`] owns the submit/wait/collect protocol:
//!
//! 1. Initialise the job and create its working directory.
//! 2. Package the planned slabs against the base parameter document and
//!    hand the task list to the executor (ownership transfers there).
//! 3. Spawn the executor's serve loop on a background task holding a child
//!    cancellation token.
//! 4. Wait for completion, event-driven: the executor's done channel when
//!    it offers one, otherwise a fixed-interval poll of `is_job_done`, in
//!    either case bounded by an explicit timeout and interruptible by the
//!    caller's cancellation token. Progress is logged every poll tick.
//! 5. Collect the completed tasks and sort them by id. Completion order is
//!    concurrent and therefore arbitrary; the sort is what restores slab
//!    order before anything downstream consumes the results.
//! 6. Write each task's raster payload to the working directory, named by
//!    its id, and return the ordered file list.
//!
//! Interruption is a clean abort, not a failure: the run returns `Ok(None)`,
//! output writing and recombination are skipped, and the serve task is torn
//! down through its token.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::JobConfig;
use crate::executor::{Executor, JobDescriptor, JobId};
use crate::plan::Slab;
use crate::scene::SceneParams;
use crate::task::{package_all, PackageError};

/// Errors raised while driving a job to completion.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The executor collaborator failed; opaque to the driver.
    #[error(transparent)]
    Executor(#[from] crate::executor::ExecutorError),

    /// Task packaging failed before submission.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// The job working directory could not be created.
    #[error("failed to prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A completed task's raster could not be written to the working
    /// directory.
    #[error("failed to write slab output {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The executor did not report completion within the configured bound.
    #[error("job {job_id} timed out after {elapsed:?}")]
    Timeout { job_id: JobId, elapsed: Duration },
}

/// Result of a completed (not aborted) job run.
#[derive(Debug)]
pub struct JobOutcome {
    /// Executor-assigned job id.
    pub job_id: JobId,

    /// Per-slab raster files in task-id order, one per task.
    pub slab_files: Vec<PathBuf>,
}

/// How the wait loop ended, short of an error.
enum WaitOutcome {
    Done,
    Aborted,
}

/// Drives one job through the executor collaborator.
pub struct JobDriver<E: Executor> {
    executor: Arc<E>,
    config: JobConfig,
}

impl<E: Executor> JobDriver<E> {
    /// Creates a driver over the given executor handle and job
    /// configuration.
    pub fn new(executor: Arc<E>, config: JobConfig) -> Self {
        Self { executor, config }
    }

    /// Runs the full job lifecycle for the planned slabs.
    ///
    /// Returns `Ok(Some(outcome))` with the ordered slab files on
    /// completion, or `Ok(None)` if `cancel` fired while waiting (clean
    /// abort: nothing is written).
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] on executor failures, packaging failures,
    /// working-directory I/O failures, or completion timeout.
    pub async fn run(
        &self,
        slabs: &[Slab],
        base: &SceneParams,
        cancel: CancellationToken,
    ) -> Result<Option<JobOutcome>, DriverError> {
        let descriptor = JobDescriptor {
            job_path: self.config.job_path.clone(),
            file_names: vec![self.config.program.clone()],
        };
        let job_id = self.executor.init_job(descriptor)?;

        let job_dir = self.config.working_dir.join(job_id.as_str());
        tokio::fs::create_dir_all(&job_dir)
            .await
            .map_err(|source| DriverError::WorkDir { path: job_dir.clone(), source })?;
        info!(job = %job_id, dir = %job_dir.display(), "job working directory ready");

        let tasks = package_all(slabs, base, job_id.as_str(), &self.config.program)?;
        let total = tasks.len();
        self.executor.load_tasks(tasks)?;
        info!(job = %job_id, total, "tasks submitted");

        // The serve loop gets a child token: caller cancellation tears it
        // down transitively, and the driver cancels it itself once the job
        // is collected or times out.
        let serve_token = cancel.child_token();
        let serve = {
            let executor = Arc::clone(&self.executor);
            let token = serve_token.clone();
            tokio::spawn(async move {
                if let Err(e) = executor.serve(token).await {
                    warn!(error = %e, "executor serve loop failed");
                }
            })
        };

        let waited = self.wait_for_completion(&job_id, &cancel).await;
        serve_token.cancel();
        let _ = serve.await;

        match waited? {
            WaitOutcome::Aborted => {
                info!(job = %job_id, "interrupted while waiting; skipping output and recombination");
                Ok(None)
            }
            WaitOutcome::Done => {
                let mut completed = self.executor.completed_tasks()?;
                completed.sort_unstable_by_key(|task| task.id);
                debug!(job = %job_id, completed = completed.len(), "completed tasks collected");

                let mut slab_files = Vec::with_capacity(completed.len());
                for task in &completed {
                    let path = job_dir.join(format!("output_{}.png", task.id));
                    tokio::fs::write(&path, &task.payload)
                        .await
                        .map_err(|source| DriverError::WriteOutput { path: path.clone(), source })?;
                    slab_files.push(path);
                }
                info!(job = %job_id, files = slab_files.len(), "slab outputs written");
                Ok(Some(JobOutcome { job_id, slab_files }))
            }
        }
    }

    /// Waits until the executor reports the job done, the caller cancels,
    /// or the configured timeout elapses.
    async fn wait_for_completion(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, DriverError> {
        let mut done_rx = self.executor.subscribe_done();
        let deadline = self.config.completion_timeout.map(|t| Instant::now() + t);
        let started = Instant::now();
        let mut progress = tokio::time::interval(self.config.poll_interval);
        // The immediate first tick only logs an initial status line.
        loop {
            if self.executor.is_job_done() {
                return Ok(WaitOutcome::Done);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(WaitOutcome::Aborted),
                _ = done_signal(&mut done_rx) => return Ok(WaitOutcome::Done),
                _ = deadline_elapsed(deadline) => {
                    return Err(DriverError::Timeout {
                        job_id: job_id.clone(),
                        elapsed: started.elapsed(),
                    });
                }
                _ = progress.tick() => {
                    let status = self.executor.status();
                    info!(
                        job = %job_id,
                        completed = status.completed,
                        total = status.total,
                        "waiting for render job"
                    );
                }
            }
        }
    }
}

/// Resolves once the done channel observes `true`; pends forever without a
/// channel (the poll tick carries the loop) or after the sender is gone.
async fn done_signal(rx: &mut Option<watch::Receiver<bool>>) {
    match rx {
        Some(rx) => loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        },
        None => futures::future::pending().await,
    }
}

/// Resolves at the deadline; pends forever when no timeout is configured.
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

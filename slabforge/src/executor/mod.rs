//! Task-execution collaborator interface.
//!
//! The driver does not schedule work itself: it hands the packaged task set
//! to an [`Executor`] and waits for the job to finish. The trait mirrors the
//! lifecycle the collaborator exposes (initialise a job, load its tasks,
//! run a long-lived serve loop, report completion, surrender the completed
//! tasks) and deliberately treats everything behind it as opaque: failures
//! inside the collaborator are its own responsibility and are neither
//! introspected nor retried here.
//!
//! # Completion signalling
//!
//! `is_job_done` supports plain polling. Executors that can do better
//! override [`Executor::subscribe_done`] to hand out a watch channel, which
//! lets the driver wait event-driven instead of sleeping; the bundled
//! [`LocalExecutor`] does this.
//!
//! # Ownership
//!
//! The task list is owned by the submitting side until `load_tasks` and by
//! the executor afterwards. Completed tasks are drained exactly once via
//! `completed_tasks`, in whatever order the workers finished them.

mod local;

pub use local::{LocalExecutor, LocalExecutorConfig, DEFAULT_MAX_CONCURRENCY};

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::task::RenderTask;

/// Identifier the executor assigns to a job at initialisation.
///
/// Used to namespace working-directory output; treated as an opaque string
/// by everything outside the executor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Creates a job id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the executor needs to stage a job before tasks arrive.
#[derive(Clone, Debug)]
pub struct JobDescriptor {
    /// Directory holding the scene document and the render program.
    pub job_path: PathBuf,

    /// Files from `job_path` that must be staged next to each worker's
    /// working directory (typically just the render program).
    pub file_names: Vec<String>,
}

/// Progress snapshot for a running job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobStatus {
    /// Tasks the executor has finished so far.
    pub completed: usize,

    /// Tasks loaded for the job.
    pub total: usize,
}

/// Opaque failures inside the executor collaborator.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A job-scoped call arrived before `init_job`.
    #[error("no job has been initialised")]
    NoJob,

    /// Tasks arrived before the job was initialised, or twice.
    #[error("task list rejected: {0}")]
    LoadRejected(String),

    /// Staging or collecting task files failed.
    #[error("executor i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure inside the collaborator.
    #[error("executor failure: {0}")]
    Internal(String),
}

/// The consumed task-execution interface.
///
/// Implementations must be shareable across tasks (`Send + Sync`); the
/// driver keeps one handle for submission and hands a clone of the shutdown
/// token to the serve loop.
pub trait Executor: Send + Sync + 'static {
    /// Initialises a job and returns its executor-assigned id.
    fn init_job(&self, descriptor: JobDescriptor) -> Result<JobId, ExecutorError>;

    /// Hands the packaged task list to the executor.
    ///
    /// Ownership of the tasks transfers here; the submitter must not touch
    /// them afterwards.
    fn load_tasks(&self, tasks: Vec<RenderTask>) -> Result<(), ExecutorError>;

    /// Runs the executor's long-lived serve loop until the job completes or
    /// `shutdown` is cancelled.
    fn serve<'a>(
        &'a self,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExecutorError>> + Send + 'a>>;

    /// Returns true once every loaded task has completed.
    fn is_job_done(&self) -> bool;

    /// Completion notification channel, if the executor supports one.
    ///
    /// The receiver observes `true` once the job is done. Executors without
    /// a notification primitive return `None` and are polled instead.
    fn subscribe_done(&self) -> Option<watch::Receiver<bool>> {
        None
    }

    /// Drains and returns the completed tasks, in completion order.
    ///
    /// Completion order is concurrent and therefore arbitrary; callers sort
    /// by task id before using the results.
    fn completed_tasks(&self) -> Result<Vec<RenderTask>, ExecutorError>;

    /// Returns a progress snapshot for status reporting.
    fn status(&self) -> JobStatus;
}

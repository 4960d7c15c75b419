//! In-process executor running render tasks as local child processes.
//!
//! [`LocalExecutor`] implements the [`Executor`] interface on a single
//! machine: each loaded task is executed by spawning its program in the job
//! directory, with the serialized payload staged as the task's input file
//! and the rendered raster collected from its output file. A bounded number
//! of child processes run concurrently.
//!
//! This is the executor the CLI and the integration tests drive; a
//! distributed deployment substitutes its own [`Executor`] implementation
//! at the same seam.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Executor, ExecutorError, JobDescriptor, JobId, JobStatus};
use crate::task::RenderTask;

/// Default number of concurrently running render processes.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Configuration for [`LocalExecutor`].
#[derive(Clone, Debug)]
pub struct LocalExecutorConfig {
    /// Maximum number of render processes running at once.
    pub max_concurrency: usize,
}

impl Default for LocalExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// State of the single job this executor serves.
struct JobState {
    id: JobId,
    descriptor: JobDescriptor,
    loaded: bool,
    pending: Vec<RenderTask>,
    completed: Vec<RenderTask>,
    total: usize,
}

/// Single-machine implementation of the executor interface.
pub struct LocalExecutor {
    config: LocalExecutorConfig,
    state: Mutex<Option<JobState>>,
    next_job: AtomicU64,
    done_tx: watch::Sender<bool>,
}

impl LocalExecutor {
    /// Creates an executor with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LocalExecutorConfig::default())
    }

    /// Creates an executor with the given configuration.
    pub fn with_config(config: LocalExecutorConfig) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            config,
            state: Mutex::new(None),
            next_job: AtomicU64::new(0),
            done_tx,
        }
    }

    /// Runs one task to completion: stage payload, spawn program, collect
    /// output.
    async fn run_task(job_path: &Path, mut task: RenderTask) -> Result<RenderTask, ExecutorError> {
        let input_path = job_path.join(&task.input_name);
        tokio::fs::write(&input_path, &task.payload).await?;

        debug!(task = task.id, program = %task.program, "spawning render process");
        let output = Command::new(&task.program)
            .args(&task.args)
            .current_dir(job_path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExecutorError::Internal(format!(
                "render program exited with {} for task {}",
                output.status, task.id
            )));
        }

        let result = tokio::fs::read(job_path.join(&task.output_name)).await?;
        task.payload = Bytes::from(result);
        Ok(task)
    }

    /// Records a finished task and flips the done channel on the last one.
    fn record_completed(&self, task: RenderTask) {
        let mut guard = self.state.lock();
        if let Some(state) = guard.as_mut() {
            state.completed.push(task);
            if state.completed.len() == state.total {
                info!(job = %state.id, total = state.total, "all tasks completed");
                self.done_tx.send_replace(true);
            }
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for LocalExecutor {
    fn init_job(&self, descriptor: JobDescriptor) -> Result<JobId, ExecutorError> {
        let mut guard = self.state.lock();
        if guard.is_some() {
            return Err(ExecutorError::Internal(
                "a job is already initialised on this executor".to_string(),
            ));
        }

        let id = JobId::new(format!("job-{}", self.next_job.fetch_add(1, Ordering::Relaxed)));
        info!(job = %id, path = %descriptor.job_path.display(), "job initialised");
        self.done_tx.send_replace(false);
        *guard = Some(JobState {
            id: id.clone(),
            descriptor,
            loaded: false,
            pending: Vec::new(),
            completed: Vec::new(),
            total: 0,
        });
        Ok(id)
    }

    fn load_tasks(&self, tasks: Vec<RenderTask>) -> Result<(), ExecutorError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ExecutorError::NoJob)?;
        if state.loaded {
            return Err(ExecutorError::LoadRejected(
                "tasks were already loaded for this job".to_string(),
            ));
        }

        state.total = tasks.len();
        state.pending = tasks;
        state.loaded = true;
        info!(job = %state.id, total = state.total, "tasks loaded");
        if state.total == 0 {
            self.done_tx.send_replace(true);
        }
        Ok(())
    }

    fn serve<'a>(
        &'a self,
        shutdown: CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ExecutorError>> + Send + 'a>>
    {
        Box::pin(async move {
            let (job_path, tasks) = {
                let mut guard = self.state.lock();
                let state = guard.as_mut().ok_or(ExecutorError::NoJob)?;
                (state.descriptor.job_path.clone(), std::mem::take(&mut state.pending))
            };

            let work = futures::stream::iter(tasks).for_each_concurrent(
                self.config.max_concurrency,
                |task| async {
                    let id = task.id;
                    match Self::run_task(&job_path, task).await {
                        Ok(done) => self.record_completed(done),
                        Err(e) => warn!(task = id, error = %e, "task execution failed"),
                    }
                },
            );

            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("serve loop shut down");
                }
                _ = work => {
                    debug!("serve loop drained all pending tasks");
                }
            }
            Ok(())
        })
    }

    fn is_job_done(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|s| s.loaded && s.completed.len() == s.total)
    }

    fn subscribe_done(&self) -> Option<watch::Receiver<bool>> {
        Some(self.done_tx.subscribe())
    }

    fn completed_tasks(&self) -> Result<Vec<RenderTask>, ExecutorError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ExecutorError::NoJob)?;
        Ok(std::mem::take(&mut state.completed))
    }

    fn status(&self) -> JobStatus {
        self.state
            .lock()
            .as_ref()
            .map(|s| JobStatus {
                completed: s.completed.len(),
                total: s.total,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Slab;
    use crate::scene::SceneParams;
    use crate::task::package_all;

    fn scene() -> SceneParams {
        serde_json::from_str(r#"{"image_width": 200, "image_height": 100}"#).unwrap()
    }

    /// Tasks whose "render program" is /bin/cp: the completed payload is the
    /// submitted payload, byte for byte.
    fn identity_tasks(job_id: &str, count: u32) -> Vec<RenderTask> {
        let slabs: Vec<Slab> = (0..count)
            .map(|i| Slab { x0: i * 10, y0: 0, x1: (i + 1) * 10, y1: 100 })
            .collect();
        package_all(&slabs, &scene(), job_id, "cp").unwrap()
    }

    fn descriptor(dir: &Path) -> JobDescriptor {
        JobDescriptor {
            job_path: dir.to_path_buf(),
            file_names: vec!["cp".to_string()],
        }
    }

    #[test]
    fn test_load_before_init_is_rejected() {
        let executor = LocalExecutor::new();
        let err = executor.load_tasks(Vec::new()).unwrap_err();
        assert!(matches!(err, ExecutorError::NoJob));
    }

    #[test]
    fn test_double_init_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        executor.init_job(descriptor(dir.path())).unwrap();
        let err = executor.init_job(descriptor(dir.path())).unwrap_err();
        assert!(matches!(err, ExecutorError::Internal(_)));
    }

    #[test]
    fn test_double_load_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        executor.init_job(descriptor(dir.path())).unwrap();
        executor.load_tasks(identity_tasks("job-0", 1)).unwrap();
        let err = executor.load_tasks(identity_tasks("job-0", 1)).unwrap_err();
        assert!(matches!(err, ExecutorError::LoadRejected(_)));
    }

    #[tokio::test]
    async fn test_serve_completes_tasks_with_result_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        let job_id = executor.init_job(descriptor(dir.path())).unwrap();
        let tasks = identity_tasks(job_id.as_str(), 3);
        let submitted: Vec<Bytes> = tasks.iter().map(|t| t.payload.clone()).collect();
        executor.load_tasks(tasks).unwrap();

        assert!(!executor.is_job_done());
        executor.serve(CancellationToken::new()).await.unwrap();
        assert!(executor.is_job_done());

        let status = executor.status();
        assert_eq!(status, JobStatus { completed: 3, total: 3 });

        let mut completed = executor.completed_tasks().unwrap();
        completed.sort_unstable_by_key(|t| t.id);
        assert_eq!(completed.len(), 3);
        for task in &completed {
            assert_eq!(task.payload, submitted[task.id as usize]);
        }
    }

    #[tokio::test]
    async fn test_done_channel_flips_on_completion() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        let job_id = executor.init_job(descriptor(dir.path())).unwrap();
        let mut done_rx = executor.subscribe_done().unwrap();
        assert!(!*done_rx.borrow_and_update());

        executor.load_tasks(identity_tasks(job_id.as_str(), 2)).unwrap();
        executor.serve(CancellationToken::new()).await.unwrap();

        done_rx.changed().await.unwrap();
        assert!(*done_rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_failed_program_does_not_complete_task() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        let job_id = executor.init_job(descriptor(dir.path())).unwrap();

        let slabs = [Slab { x0: 0, y0: 0, x1: 10, y1: 10 }];
        // "false" exits non-zero without producing an output file.
        let tasks = package_all(&slabs, &scene(), job_id.as_str(), "false").unwrap();
        executor.load_tasks(tasks).unwrap();

        executor.serve(CancellationToken::new()).await.unwrap();
        assert!(!executor.is_job_done());
        assert_eq!(executor.status(), JobStatus { completed: 0, total: 1 });
    }

    #[tokio::test]
    async fn test_cancelled_serve_returns_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        let job_id = executor.init_job(descriptor(dir.path())).unwrap();

        let slabs = [Slab { x0: 0, y0: 0, x1: 10, y1: 10 }];
        // A render program that would outlive the test by far.
        let tasks = package_all(&slabs, &scene(), job_id.as_str(), "sleep").unwrap();
        let tasks = tasks
            .into_iter()
            .map(|mut t| {
                t.args = vec!["60".to_string()];
                t
            })
            .collect();
        executor.load_tasks(tasks).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        executor.serve(shutdown).await.unwrap();
        assert!(!executor.is_job_done());
    }

    #[test]
    fn test_status_before_init_is_empty() {
        let executor = LocalExecutor::new();
        assert_eq!(executor.status(), JobStatus::default());
    }
}

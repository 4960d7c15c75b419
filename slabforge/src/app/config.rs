//! Job configuration.
//!
//! One [`JobConfig`] value describes everything a render job needs: image
//! geometry, slab size, where the job's scene and program live, where
//! intermediate and final output goes, and how the driver waits. The value
//! is immutable once built and is passed through constructors; components
//! never reach for process-wide state, so concurrent jobs in separate
//! executors and isolated tests all work from their own config.

use std::path::PathBuf;
use std::time::Duration;

use crate::executor::DEFAULT_MAX_CONCURRENCY;

/// Default slab edge length in pixels.
pub const DEFAULT_SLAB_DIM: u32 = 100;

/// Default full-image width in pixels.
pub const DEFAULT_IMAGE_WIDTH: u32 = 1080;

/// Default full-image height in pixels.
pub const DEFAULT_IMAGE_HEIGHT: u32 = 720;

/// Default progress-poll interval while waiting for the executor (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default bound on waiting for job completion (seconds).
///
/// An unresponsive executor surfaces as a timeout error instead of hanging
/// the driver indefinitely.
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 3600;

/// Immutable configuration for one render job.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Full image width in pixels.
    pub image_width: u32,

    /// Full image height in pixels.
    pub image_height: u32,

    /// Slab edge length in pixels.
    pub slab_dim: u32,

    /// Directory holding `scene.json` and the render program.
    pub job_path: PathBuf,

    /// Render program reference, relative to the job directory.
    pub program: String,

    /// Root directory for per-job intermediate slab output; the driver
    /// creates `<working_dir>/<job_id>/` under it.
    pub working_dir: PathBuf,

    /// Path the final composite raster is written to.
    pub composite_path: PathBuf,

    /// How often the driver logs progress while waiting.
    pub poll_interval: Duration,

    /// Bound on waiting for job completion; `None` waits indefinitely.
    pub completion_timeout: Option<Duration>,

    /// Concurrent render processes for the local executor.
    pub max_concurrency: usize,
}

impl JobConfig {
    /// Creates a config for the given job and working directories with
    /// defaults for everything else.
    pub fn new(job_path: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let composite_path = working_dir.join("render.png");
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            slab_dim: DEFAULT_SLAB_DIM,
            job_path: job_path.into(),
            program: "./render.sh".to_string(),
            working_dir,
            composite_path,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            completion_timeout: Some(Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS)),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the full image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Sets the slab edge length.
    pub fn with_slab_dim(mut self, slab_dim: u32) -> Self {
        self.slab_dim = slab_dim;
        self
    }

    /// Sets the render program reference.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets the composite output path.
    pub fn with_composite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.composite_path = path.into();
        self
    }

    /// Sets the progress-poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets (or disables) the completion-wait bound.
    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Sets the local executor's process concurrency.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

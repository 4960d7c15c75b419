//! Application-level wiring: configuration, errors, and orchestration.

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{run_job, RunSummary};
pub use config::{
    JobConfig, DEFAULT_COMPLETION_TIMEOUT_SECS, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SLAB_DIM,
};
pub use error::AppError;

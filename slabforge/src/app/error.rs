//! Application error types.

use std::fmt;

use crate::compose::ComposeError;
use crate::driver::DriverError;
use crate::plan::PlanError;
use crate::scene::SceneError;

/// Errors that can occur while running a render job end to end.
#[derive(Debug)]
pub enum AppError {
    /// Slab planning rejected the job geometry.
    Plan(PlanError),

    /// The base parameter document could not be loaded.
    Scene(SceneError),

    /// Driving the job against the executor failed.
    Driver(DriverError),

    /// Recombining the slab outputs failed.
    Compose(ComposeError),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Plan(e) => write!(f, "Failed to plan slab grid: {}", e),
            AppError::Scene(e) => write!(f, "Failed to load scene document: {}", e),
            AppError::Driver(e) => write!(f, "Failed to drive render job: {}", e),
            AppError::Compose(e) => write!(f, "Failed to recombine slab output: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Plan(e) => Some(e),
            AppError::Scene(e) => Some(e),
            AppError::Driver(e) => Some(e),
            AppError::Compose(e) => Some(e),
            AppError::Config(_) => None,
        }
    }
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        AppError::Plan(e)
    }
}

impl From<SceneError> for AppError {
    fn from(e: SceneError) -> Self {
        AppError::Scene(e)
    }
}

impl From<DriverError> for AppError {
    fn from(e: DriverError) -> Self {
        AppError::Driver(e)
    }
}

impl From<ComposeError> for AppError {
    fn from(e: ComposeError) -> Self {
        AppError::Compose(e)
    }
}

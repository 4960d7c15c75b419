//! Slabforge - distributed slab rendering driver
//!
//! Slabforge splits a raster image into a grid of rectangular slabs, packages
//! each slab as a self-contained render task, hands the task set to a
//! task-execution collaborator, waits for completion, and recombines the
//! per-slab output into the final composite image.
//!
//! # Pipeline
//!
//! ```text
//! plan ──► task ──► driver ──► compose
//!  grid    package   submit,    reassemble
//!          tasks     wait,      composite
//!                    collect
//! ```
//!
//! The executor collaborator sits behind the [`executor::Executor`] trait;
//! [`executor::LocalExecutor`] is the bundled single-machine implementation.
//! [`app::run_job`] wires the whole pipeline together for one job.

pub mod app;
pub mod compose;
pub mod driver;
pub mod executor;
pub mod plan;
pub mod scene;
pub mod task;

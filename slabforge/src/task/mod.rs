//! Render task descriptors and packaging.
//!
//! Packaging turns one [`Slab`] plus the job's base [`SceneParams`] into a
//! fully self-contained [`RenderTask`]: the task carries everything a worker
//! needs (program reference, arguments, serialized parameters, file names)
//! and nothing else. Tasks are immutable from creation; the executor hands
//! them back with the rendered raster bytes in [`RenderTask::payload`].
//!
//! # Ordering contract
//!
//! `package(slab, index, ...)` guarantees `task.id == index`, and
//! [`package_all`] enumerates the planner's slab sequence, so task ids
//! reproduce slab order exactly. The id is the sole join key between
//! submission order and (unordered) completion order.

use bytes::Bytes;
use thiserror::Error;

use crate::plan::Slab;
use crate::scene::SceneParams;

/// Sequential task identifier, assigned from slab order starting at 0.
pub type TaskId = u32;

/// Errors raised while packaging a slab into a task.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The merged parameter document could not be serialized.
    #[error("failed to serialize render parameters for task {id}: {source}")]
    Serialize {
        id: TaskId,
        #[source]
        source: serde_json::Error,
    },
}

/// A unit of work for the executor collaborator: one slab render request.
///
/// All fields crossing the executor boundary are plain data, so the task
/// can be shipped to a worker that shares no memory with this process.
#[derive(Clone, Debug)]
pub struct RenderTask {
    /// Sequential id equal to the slab's position in plan order.
    pub id: TaskId,

    /// Program the worker invokes, relative to the staged job directory.
    pub program: String,

    /// Ordered program arguments: the payload file, then the output file.
    pub args: Vec<String>,

    /// Serialized render parameters on submission; the rendered raster
    /// bytes once the executor reports the task complete.
    pub payload: Bytes,

    /// File name the worker reads the payload from.
    pub input_name: String,

    /// File name the worker writes its slab raster to.
    pub output_name: String,
}

/// Packages one slab as a render task.
///
/// Merges the slab window into a copy of the base document, points the
/// document's output path at `job/<job_id>/output_<index>.png`, serializes
/// the result as the task payload, and derives the worker-side file names
/// from the index.
///
/// Packaging is pure: no I/O, no shared mutable state, and identical inputs
/// produce identical tasks.
///
/// # Errors
///
/// Returns [`PackageError`] if the merged document cannot be serialized.
pub fn package(
    slab: &Slab,
    index: TaskId,
    base: &SceneParams,
    job_id: &str,
    program: &str,
) -> Result<RenderTask, PackageError> {
    let output_file = format!("job/{}/output_{}.png", job_id, index);
    let params = base.with_slab(slab, output_file);
    let payload = serde_json::to_vec(&params)
        .map_err(|source| PackageError::Serialize { id: index, source })?;

    let input_name = format!("payload_{}.json", index);
    let output_name = format!("output_{}.png", index);

    Ok(RenderTask {
        id: index,
        program: program.to_string(),
        args: vec![input_name.clone(), output_name.clone()],
        payload: Bytes::from(payload),
        input_name,
        output_name,
    })
}

/// Packages the full plan-ordered slab sequence.
///
/// Task ids are the slab indices, so the returned list preserves plan order
/// bit-for-bit.
pub fn package_all(
    slabs: &[Slab],
    base: &SceneParams,
    job_id: &str,
    program: &str,
) -> Result<Vec<RenderTask>, PackageError> {
    slabs
        .iter()
        .enumerate()
        .map(|(index, slab)| package(slab, index as TaskId, base, job_id, program))
        .collect()
}

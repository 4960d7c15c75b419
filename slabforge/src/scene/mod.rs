//! Render parameter documents.
//!
//! A job is described by a scene document (`scene.json` in the job
//! directory): a JSON object holding the renderer's full configuration.
//! The fields the driver itself reads or writes are statically typed on
//! [`SceneParams`]; everything else the renderer understands (camera,
//! objects, lights, samplers, ...) is carried through untouched in a
//! flattened key-value map, so the packager never drops configuration it
//! does not interpret.
//!
//! Per-task parameter injection goes through [`SceneParams::with_slab`],
//! which returns a copy with the slab window and output path set. The base
//! document itself is never mutated.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::plan::Slab;

/// Errors raised while loading the base parameter document.
///
/// These are fatal at startup: no job is initialised and no task is
/// submitted if the scene document cannot be read and parsed.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The document could not be read from disk.
    #[error("failed to read scene document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not the JSON object the renderer expects.
    #[error("malformed scene document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The render parameter document shared by all tasks of a job.
///
/// Slab-window fields are `None` on the base template and populated per
/// task. Serialization skips unset fields, so the payload sent to a worker
/// contains exactly the keys the renderer's taskfile parser expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneParams {
    /// Full image width in pixels.
    pub image_width: u32,

    /// Full image height in pixels.
    pub image_height: u32,

    /// Left edge of the task's slab window (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab_startx: Option<u32>,

    /// Right edge of the task's slab window (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab_endx: Option<u32>,

    /// Top edge of the task's slab window (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab_starty: Option<u32>,

    /// Bottom edge of the task's slab window (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slab_endy: Option<u32>,

    /// Path the worker writes its slab raster to, namespaced by job id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    /// Renderer configuration passed through verbatim (camera, objects,
    /// lights, samplers, max_depth, background, ...).
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl SceneParams {
    /// Loads the base parameter document from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] if the file cannot be read or does not parse
    /// as a scene document with integer `image_width`/`image_height`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns a copy of the document with the slab window and per-task
    /// output path filled in.
    ///
    /// This is the only place task packaging touches the document; the base
    /// template stays untouched so every task starts from identical state.
    pub fn with_slab(&self, slab: &Slab, output_file: impl Into<String>) -> Self {
        let mut params = self.clone();
        params.slab_startx = Some(slab.x0);
        params.slab_endx = Some(slab.x1);
        params.slab_starty = Some(slab.y0);
        params.slab_endy = Some(slab.y1);
        params.output_file = Some(output_file.into());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_doc() -> &'static str {
        r#"{
            "image_width": 1080,
            "image_height": 720,
            "max_depth": 5,
            "background": [0.0, 0.0, 0.0],
            "objects": [{"type": "sphere", "radius": 1.0}]
        }"#
    }

    #[test]
    fn test_parse_keeps_unknown_fields() {
        let params: SceneParams = serde_json::from_str(base_doc()).unwrap();
        assert_eq!(params.image_width, 1080);
        assert_eq!(params.image_height, 720);
        assert_eq!(params.slab_startx, None);
        assert!(params.rest.contains_key("max_depth"));
        assert!(params.rest.contains_key("objects"));
    }

    #[test]
    fn test_unset_slab_fields_are_not_serialized() {
        let params: SceneParams = serde_json::from_str(base_doc()).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("slab_startx"));
        assert!(!json.contains("output_file"));
    }

    #[test]
    fn test_with_slab_sets_window_and_output() {
        let params: SceneParams = serde_json::from_str(base_doc()).unwrap();
        let slab = Slab { x0: 100, y0: 200, x1: 200, y1: 300 };

        let task_params = params.with_slab(&slab, "job/7/output_3.png");
        assert_eq!(task_params.slab_startx, Some(100));
        assert_eq!(task_params.slab_endx, Some(200));
        assert_eq!(task_params.slab_starty, Some(200));
        assert_eq!(task_params.slab_endy, Some(300));
        assert_eq!(task_params.output_file.as_deref(), Some("job/7/output_3.png"));

        // Base template untouched.
        assert_eq!(params.slab_startx, None);
        assert_eq!(params.output_file, None);

        // Renderer configuration survives the copy.
        assert!(task_params.rest.contains_key("objects"));
    }

    #[test]
    fn test_round_trip_preserves_renderer_config() {
        let params: SceneParams = serde_json::from_str(base_doc()).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let reparsed: SceneParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, reparsed);
    }

    #[test]
    fn test_from_file_missing_file() {
        let err = SceneParams::from_file("/nonexistent/scene.json").unwrap_err();
        assert!(matches!(err, SceneError::Read { .. }));
    }

    #[test]
    fn test_from_file_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, "{\"image_width\": \"wide\"}").unwrap();
        let err = SceneParams::from_file(&path).unwrap_err();
        assert!(matches!(err, SceneError::Parse { .. }));
    }

    #[test]
    fn test_from_file_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, base_doc()).unwrap();
        let params = SceneParams::from_file(&path).unwrap();
        assert_eq!((params.image_width, params.image_height), (1080, 720));
    }
}

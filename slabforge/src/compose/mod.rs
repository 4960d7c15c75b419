//! Composite reassembly of rendered slabs.
//!
//! [`combine`] walks the ordered slab rasters with a placement cursor and
//! pastes each one onto the composite canvas at its computed offset. Slabs
//! arrive in plan order (left-to-right, rows top-to-bottom) while canvas
//! rows advance bottom-to-top: the renderer's scene y axis points up, so a
//! slab planned at `[y0, y1)` holds the canvas rows `[H − y1, H − y0)`.
//! Walking the canvas upward therefore reproduces the source image exactly;
//! the round-trip integration test pins this pairing.
//!
//! All slabs within one row must share a height. Uneven heights that still
//! fit the canvas produce a visually scrambled composite rather than an
//! error; only placements that leave the canvas are rejected.

use std::path::{Path, PathBuf};

use image::{GenericImage, RgbaImage};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reassembling the composite raster.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// An expected slab raster is missing or undecodable.
    #[error("failed to open slab image {path}: {source}")]
    OpenSlab {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A slab's dimensions are inconsistent with the placement cursor.
    #[error(
        "slab {index} ({width}×{height}) does not fit the canvas at ({x}, {y})"
    )]
    Misplaced {
        index: usize,
        width: u32,
        height: u32,
        x: u32,
        y: i64,
    },

    /// The finished composite could not be written.
    #[error("failed to write composite {path}: {source}")]
    WriteComposite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Accounting for a finished composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeStats {
    /// Number of slabs placed.
    pub slab_count: usize,

    /// Total pixels placed; equals `width × height` for well-formed input.
    pub placed_area: u64,
}

/// Reassembles the ordered slab rasters into one `image_width` ×
/// `image_height` composite and writes it to `out_path`.
///
/// The placement cursor starts at `(0, image_height − first_slab_height)`;
/// each slab is placed with its own pixel dimensions (boundary slabs are
/// smaller), x advances by the placed width, and when a row is full the
/// cursor wraps to `x = 0` one slab-height further up the canvas.
///
/// # Errors
///
/// Returns [`ComposeError`] if a slab file is missing or undecodable, if a
/// slab does not fit the canvas at its cursor position, or if the composite
/// cannot be written.
pub fn combine(
    slab_files: &[PathBuf],
    image_width: u32,
    image_height: u32,
    out_path: &Path,
) -> Result<CompositeStats, ComposeError> {
    let mut canvas = RgbaImage::new(image_width, image_height);
    let mut x: u32 = 0;
    let mut y: i64 = 0;
    let mut placed_area: u64 = 0;

    for (index, file) in slab_files.iter().enumerate() {
        let slab = image::open(file)
            .map_err(|source| ComposeError::OpenSlab { path: file.clone(), source })?
            .to_rgba8();

        if index == 0 {
            y = i64::from(image_height) - i64::from(slab.height());
        } else if x >= image_width {
            x = 0;
            y -= i64::from(slab.height());
        }

        let fits = y >= 0
            && x.saturating_add(slab.width()) <= image_width
            && (y as u64).saturating_add(u64::from(slab.height())) <= u64::from(image_height);
        if !fits {
            return Err(ComposeError::Misplaced {
                index,
                width: slab.width(),
                height: slab.height(),
                x,
                y,
            });
        }

        // Bounds were checked above; copy_from cannot fail here.
        let _ = canvas.copy_from(&slab, x, y as u32);
        placed_area += u64::from(slab.width()) * u64::from(slab.height());
        x += slab.width();
    }

    debug!(
        slabs = slab_files.len(),
        placed_area,
        canvas_area = u64::from(image_width) * u64::from(image_height),
        "composite assembled"
    );

    canvas
        .save(out_path)
        .map_err(|source| ComposeError::WriteComposite { path: out_path.to_path_buf(), source })?;

    Ok(CompositeStats {
        slab_count: slab_files.len(),
        placed_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Writes a solid-colour slab raster and returns its path.
    fn write_slab(dir: &Path, name: &str, width: u32, height: u32, colour: Rgba<u8>) -> PathBuf {
        let mut img = RgbaImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = colour;
        }
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_combine_places_rows_bottom_to_top() {
        let dir = tempfile::tempdir().unwrap();
        // 2×2 grid of 10×10 slabs in plan order; distinct colours per slab.
        let colours = [
            Rgba([255, 0, 0, 255]),
            Rgba([0, 255, 0, 255]),
            Rgba([0, 0, 255, 255]),
            Rgba([255, 255, 0, 255]),
        ];
        let files: Vec<PathBuf> = colours
            .iter()
            .enumerate()
            .map(|(i, &c)| write_slab(dir.path(), &format!("output_{}.png", i), 10, 10, c))
            .collect();

        let out = dir.path().join("composite.png");
        let stats = combine(&files, 20, 20, &out).unwrap();
        assert_eq!(stats, CompositeStats { slab_count: 4, placed_area: 400 });

        let composite = image::open(&out).unwrap().to_rgba8();
        // Plan row 0 (slabs 0, 1) lands on the bottom canvas rows.
        assert_eq!(*composite.get_pixel(0, 15), colours[0]);
        assert_eq!(*composite.get_pixel(15, 15), colours[1]);
        // Plan row 1 (slabs 2, 3) lands above it.
        assert_eq!(*composite.get_pixel(0, 5), colours[2]);
        assert_eq!(*composite.get_pixel(15, 5), colours[3]);
    }

    #[test]
    fn test_combine_supports_clipped_boundary_slabs() {
        let dir = tempfile::tempdir().unwrap();
        // 25×15 canvas at slab 10: columns 10/10/5, rows 10/5.
        let mut files = Vec::new();
        let widths = [10u32, 10, 5];
        for (i, &w) in widths.iter().enumerate() {
            files.push(write_slab(dir.path(), &format!("output_{}.png", i), w, 10, Rgba([10, 0, 0, 255])));
        }
        for (i, &w) in widths.iter().enumerate() {
            files.push(write_slab(dir.path(), &format!("output_{}.png", i + 3), w, 5, Rgba([0, 10, 0, 255])));
        }

        let out = dir.path().join("composite.png");
        let stats = combine(&files, 25, 15, &out).unwrap();
        assert_eq!(stats.placed_area, 25 * 15);

        let composite = image::open(&out).unwrap().to_rgba8();
        // First plan row (height 10) fills the bottom of the canvas.
        assert_eq!(*composite.get_pixel(24, 14), Rgba([10, 0, 0, 255]));
        // Second plan row (height 5) sits at the top.
        assert_eq!(*composite.get_pixel(0, 0), Rgba([0, 10, 0, 255]));
    }

    #[test]
    fn test_combine_single_slab_spans_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_slab(dir.path(), "output_0.png", 20, 20, Rgba([1, 2, 3, 255]));
        let out = dir.path().join("composite.png");

        let stats = combine(&[file], 20, 20, &out).unwrap();
        assert_eq!(stats, CompositeStats { slab_count: 1, placed_area: 400 });

        let composite = image::open(&out).unwrap().to_rgba8();
        assert_eq!(*composite.get_pixel(10, 10), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_combine_missing_slab_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("composite.png");
        let missing = dir.path().join("output_0.png");
        let err = combine(&[missing], 10, 10, &out).unwrap_err();
        assert!(matches!(err, ComposeError::OpenSlab { .. }));
    }

    #[test]
    fn test_combine_rejects_slab_leaving_canvas() {
        let dir = tempfile::tempdir().unwrap();
        // A slab taller than the canvas puts the cursor below row zero.
        let file = write_slab(dir.path(), "output_0.png", 10, 30, Rgba([9, 9, 9, 255]));
        let out = dir.path().join("composite.png");
        let err = combine(&[file], 10, 20, &out).unwrap_err();
        match err {
            ComposeError::Misplaced { index, height, .. } => {
                assert_eq!(index, 0);
                assert_eq!(height, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_combine_rejects_overflow_past_top() {
        let dir = tempfile::tempdir().unwrap();
        // Three full rows into a two-row canvas: the third wraps above row 0.
        let files: Vec<PathBuf> = (0..3)
            .map(|i| write_slab(dir.path(), &format!("output_{}.png", i), 10, 10, Rgba([i as u8, 0, 0, 255])))
            .collect();
        let out = dir.path().join("composite.png");
        let err = combine(&files, 10, 20, &out).unwrap_err();
        assert!(matches!(err, ComposeError::Misplaced { index: 2, .. }));
    }

    #[test]
    fn test_combine_empty_input_writes_blank_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("composite.png");
        let stats = combine(&[], 5, 5, &out).unwrap();
        assert_eq!(stats, CompositeStats { slab_count: 0, placed_area: 0 });
        assert!(out.exists());
    }
}

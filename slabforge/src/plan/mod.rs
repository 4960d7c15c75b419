//! Slab grid planning.
//!
//! An image is divided into a row-major grid of rectangular slabs, each of
//! which becomes one independently renderable task. The grid is produced
//! once per job by [`partition`] and is immutable afterwards; slab order is
//! significant (left-to-right within a row, rows top-to-bottom) because the
//! position of a slab in the sequence becomes its task id, and that id later
//! drives recombination placement.
//!
//! # Example
//!
//! ```
//! use slabforge::plan::partition;
//!
//! let slabs = partition(1080, 720, 100).unwrap();
//! assert_eq!(slabs.len(), 88); // 11 columns × 8 rows
//! assert_eq!(slabs[0].width(), 100);
//! assert_eq!(slabs[10].width(), 80); // clipped boundary column
//! ```

use std::fmt;

/// A rectangular sub-region of the render target assigned to one task.
///
/// Coordinates are half-open: the slab covers pixels `[x0, x1) × [y0, y1)`.
/// Planning guarantees `x0 < x1 <= image_width` and `y0 < y1 <= image_height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slab {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive), in the planner's top-down scan order.
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl Slab {
    /// Width of the slab in pixels.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height of the slab in pixels.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Number of pixels covered by the slab.
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

impl fmt::Display for Slab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})×[{}, {})", self.x0, self.x1, self.y0, self.y1)
    }
}

/// Errors detected while planning the slab grid.
///
/// All planning errors are fatal and occur before any task is created or
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The requested slab dimension is zero; the scan would never advance.
    ZeroSlabDim,
    /// The image has no pixels in at least one dimension.
    EmptyImage { width: u32, height: u32 },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::ZeroSlabDim => write!(f, "slab dimension must be greater than zero"),
            PlanError::EmptyImage { width, height } => {
                write!(f, "image dimensions {}×{} contain no pixels", width, height)
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Partitions an `image_width` × `image_height` raster into an ordered grid
/// of slabs with edge length `slab_dim`.
///
/// The scan is row-major: x sweeps left-to-right within a row, rows advance
/// top-to-bottom. A post-pass clips every slab's end coordinate to the image
/// bounds, producing smaller boundary slabs when the dimensions are not
/// exact multiples of `slab_dim`.
///
/// The returned sequence exactly tiles `[0, image_width) × [0, image_height)`
/// with no gaps and no overlaps, and contains
/// `⌈W/slab_dim⌉ × ⌈H/slab_dim⌉` slabs.
///
/// # Errors
///
/// Returns [`PlanError`] if `slab_dim` is zero or either image dimension is
/// zero.
pub fn partition(image_width: u32, image_height: u32, slab_dim: u32) -> Result<Vec<Slab>, PlanError> {
    if slab_dim == 0 {
        return Err(PlanError::ZeroSlabDim);
    }
    if image_width == 0 || image_height == 0 {
        return Err(PlanError::EmptyImage {
            width: image_width,
            height: image_height,
        });
    }

    let mut slabs = Vec::new();
    let mut y = 0;
    while y < image_height {
        let mut x = 0;
        while x < image_width {
            slabs.push(Slab {
                x0: x,
                y0: y,
                x1: x.saturating_add(slab_dim),
                y1: y.saturating_add(slab_dim),
            });
            x = x.saturating_add(slab_dim);
        }
        y = y.saturating_add(slab_dim);
    }

    // Clip tentative end coordinates to the image bounds.
    for slab in &mut slabs {
        if slab.x1 > image_width {
            slab.x1 = image_width;
        }
        if slab.y1 > image_height {
            slab.y1 = image_height;
        }
    }

    Ok(slabs)
}

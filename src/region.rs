//! Output region and padding geometry.
//!
//! The output region is the final requested image extent; padding is the
//! extra border computed around it so that convolution edge effects never
//! leak into the requested pixels. Both are plain value types shared by the
//! pupil builder (grid sizing), the image former (cropping), and the
//! composition pipeline (scatterer placement).

use serde::{Deserialize, Serialize};

/// Requested output extent: origin plus size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRegion {
    /// First row of the region in the caller's coordinate space
    pub row: usize,
    /// First column of the region in the caller's coordinate space
    pub col: usize,
    /// Region height in pixels
    pub height: usize,
    /// Region width in pixels
    pub width: usize,
}

impl OutputRegion {
    /// Create a region from origin and size
    pub fn new(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self {
            row,
            col,
            height,
            width,
        }
    }

    /// Create a region from a (row, col, height, width) tuple
    pub fn from_tuple(region: (usize, usize, usize, usize)) -> Self {
        Self::new(region.0, region.1, region.2, region.3)
    }

    /// Convert to a (row, col, height, width) tuple
    pub fn to_tuple(&self) -> (usize, usize, usize, usize) {
        (self.row, self.col, self.height, self.width)
    }

    /// Region shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Per-side padding around the output region, in pixels.
///
/// Padding is non-negative by construction and may differ per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Padding {
    /// Create padding from explicit per-side values
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Symmetric padding on all four sides
    pub fn uniform(pad: usize) -> Self {
        Self::new(pad, pad, pad, pad)
    }

    /// Create padding from a (top, bottom, left, right) tuple
    pub fn from_tuple(padding: (usize, usize, usize, usize)) -> Self {
        Self::new(padding.0, padding.1, padding.2, padding.3)
    }

    /// Shape of the padded grid enclosing `region`, as (rows, cols).
    ///
    /// Always at least as large as the region in both axes.
    pub fn padded_shape(&self, region: &OutputRegion) -> (usize, usize) {
        (
            region.height + self.top + self.bottom,
            region.width + self.left + self.right,
        )
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(0)
    }
}

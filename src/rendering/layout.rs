//! Grid planning for the stitched canvas
//!
//! Pure math: image counts and pixel dimensions in, cell geometry out.
//! Nothing here allocates a canvas or touches pixel data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grid shapes the stitcher can produce.
///
/// The serialized names ("tight", "square") are what the preference
/// file stores and what the CLI accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    /// Near-square grid with no trailing empty rows
    #[serde(rename = "tight")]
    TightGrid,
    /// Square grid, padded with empty cells when the count is not a
    /// perfect square
    #[serde(rename = "square")]
    PerfectSquare,
}

impl LayoutMode {
    /// Label used in artifact filenames
    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::TightGrid => "tight-grid",
            LayoutMode::PerfectSquare => "perfect-square",
        }
    }
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::TightGrid
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::TightGrid => f.write_str("tight"),
            LayoutMode::PerfectSquare => f.write_str("square"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tight" | "tight-grid" => Ok(LayoutMode::TightGrid),
            "square" | "perfect-square" => Ok(LayoutMode::PerfectSquare),
            other => Err(format!(
                "unknown layout {:?} (expected \"tight\" or \"square\")",
                other
            )),
        }
    }
}

/// How an image is placed inside its square cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to fit entirely within the cell, preserving aspect ratio
    Contain,
    /// Scale to fill the whole cell, preserving aspect ratio; the
    /// overflowing edges are cropped
    Cover,
}

impl Default for FitMode {
    fn default() -> Self {
        FitMode::Contain
    }
}

/// Column and row counts for a planned grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub cols: u32,
    pub rows: u32,
}

/// Shape a grid for `count` images.
///
/// Columns are always `ceil(sqrt(count))`. Tight grids use only as
/// many rows as the count fills; perfect squares use `cols` rows.
pub fn plan_grid(count: usize, mode: LayoutMode) -> GridShape {
    if count == 0 {
        return GridShape { cols: 0, rows: 0 };
    }
    let cols = (count as f64).sqrt().ceil() as u32;
    let rows = match mode {
        LayoutMode::TightGrid => ((count as u32) + cols - 1) / cols,
        LayoutMode::PerfectSquare => cols,
    };
    GridShape { cols, rows }
}

/// Edge length of the square cell: the largest single dimension seen
/// across every image, so no image ever needs to shrink below what the
/// grid allows.
pub fn tile_edge(dimensions: &[(u32, u32)]) -> u32 {
    dimensions
        .iter()
        .map(|&(w, h)| w.max(h))
        .max()
        .unwrap_or(0)
}

/// Full canvas geometry: grid shape plus cell size and gutters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasPlan {
    pub shape: GridShape,
    pub tile: u32,
    pub padding: u32,
}

impl CanvasPlan {
    pub fn new(shape: GridShape, tile: u32, padding: u32) -> Self {
        CanvasPlan {
            shape,
            tile,
            padding,
        }
    }

    /// Canvas width: cells plus a gutter around and between columns
    pub fn width(&self) -> u32 {
        self.shape.cols * self.tile + (self.shape.cols + 1) * self.padding
    }

    pub fn height(&self) -> u32 {
        self.shape.rows * self.tile + (self.shape.rows + 1) * self.padding
    }

    /// Top-left corner of the cell for the image at `index`
    /// (row-major placement order)
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let col = (index as u32) % self.shape.cols;
        let row = (index as u32) / self.shape.cols;
        let x = self.padding + col * (self.tile + self.padding);
        let y = self.padding + row * (self.tile + self.padding);
        (x, y)
    }
}

/// Dimensions of `(width, height)` scaled to fit within a square of
/// `edge`, preserving aspect ratio. Small images scale up.
pub fn fit_within(width: u32, height: u32, edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 || edge == 0 {
        return (0, 0);
    }
    let scale = (edge as f64 / width as f64).min(edge as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, edge);
    let h = ((height as f64 * scale).round() as u32).clamp(1, edge);
    (w, h)
}

/// Dimensions of `(width, height)` scaled so a square of `edge` is
/// covered in both axes, preserving aspect ratio. Never smaller than
/// the square; the caller crops the overflow.
pub fn cover_within(width: u32, height: u32, edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 || edge == 0 {
        return (0, 0);
    }
    let scale = (edge as f64 / width as f64).max(edge as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(edge);
    let h = ((height as f64 * scale).round() as u32).max(edge);
    (w, h)
}

/// Offset that centers a span of `inner` inside a span of `outer`
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

// THEORY:
// The `grid` module decides *where* depth is read. A grid is a fixed set of
// sample locations in normalized image space ([0, 1] on each axis), so the same
// configuration works for a 256x192 depth map and a 1920x1440 color frame alike.
//
// Key architectural principles:
// 1.  **Resolution Independence**: Points never carry pixel coordinates. Each
//     consumer scales them to its own extent at the moment of use.
// 2.  **Stable Ordering**: Points are produced row-major (left to right, then top
//     to bottom). Sample and label sequences are indexed the same way, so index
//     `i` always refers to the same physical location.
// 3.  **Purity**: `generate_grid` has no state. Same inputs, same sequence.

use crate::errors::{OverlayError, OverlayResult};
use serde::{Deserialize, Serialize};

/// A sample location relative to the image extent. Both axes lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub x: f32,
    pub y: f32,
}

impl GridPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// How the outermost rows and columns are inset from the image border.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Margin {
    #[default]
    /// Split each axis into `dimension + 1` equal segments and sample the
    /// interior boundaries: a 5x5 grid samples at 1/6, 2/6, .. 5/6.
    Segments,
    /// Inset the first and last row/column by `value` and space the rest
    /// evenly between them. A single row or column sits at the center.
    Fraction { value: f32 },
}

impl Margin {
    fn validate(&self) -> OverlayResult<()> {
        match *self {
            Margin::Segments => Ok(()),
            Margin::Fraction { value } if value.is_finite() && (0.0..0.5).contains(&value) => Ok(()),
            Margin::Fraction { value } => Err(OverlayError::InvalidConfiguration(format!(
                "margin fraction must lie in [0, 0.5), got {value}"
            ))),
        }
    }

    /// Normalized position of slot `index` on an axis with `count` slots.
    fn position(&self, index: u32, count: u32) -> f32 {
        match *self {
            Margin::Segments => (index + 1) as f32 / (count + 1) as f32,
            Margin::Fraction { value } => {
                if count == 1 {
                    0.5
                } else {
                    value + index as f32 * (1.0 - 2.0 * value) / (count - 1) as f32
                }
            }
        }
    }
}

/// Grid dimensions plus margin policy, as carried in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub margin: Margin,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 5,
            margin: Margin::Segments,
        }
    }
}

impl GridSpec {
    pub fn square(dimension: u32, margin: Margin) -> Self {
        Self {
            rows: dimension,
            cols: dimension,
            margin,
        }
    }

    pub fn point_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn points(&self) -> OverlayResult<Vec<GridPoint>> {
        generate_grid(self.rows, self.cols, self.margin)
    }
}

/// Produces `rows * cols` points in row-major order.
pub fn generate_grid(rows: u32, cols: u32, margin: Margin) -> OverlayResult<Vec<GridPoint>> {
    if rows == 0 || cols == 0 {
        return Err(OverlayError::InvalidConfiguration(format!(
            "grid dimensions must be positive, got {rows}x{cols}"
        )));
    }
    margin.validate()?;

    let mut points = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        let y = margin.position(row, rows);
        for col in 0..cols {
            points.push(GridPoint::new(margin.position(col, cols), y));
        }
    }
    Ok(points)
}

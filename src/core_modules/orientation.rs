// THEORY:
// Depth sensors are mounted landscape while the display is often portrait, so a
// point the user sees is not at the same normalized location in the buffer.
// This module owns that one transform. Every sampler call goes through
// `Orientation::display_to_buffer` and `to_pixel`; nothing else does axis math.

use crate::core_modules::grid::GridPoint;
use serde::{Deserialize, Serialize};

/// How displayed frames are rotated relative to the sensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Display and buffer share axes.
    #[default]
    Up,
    /// The display shows the buffer rotated 90 degrees clockwise, the usual
    /// portrait presentation of a landscape sensor.
    Right,
}

impl Orientation {
    /// Maps a point normalized to the displayed frame onto the buffer.
    ///
    /// `Up` is the identity. `Right` maps `(u, v)` to `(v, 1 - u)`: the left
    /// edge of the display is the bottom row of the buffer.
    pub fn display_to_buffer(self, point: GridPoint) -> GridPoint {
        match self {
            Orientation::Up => point,
            Orientation::Right => GridPoint::new(point.y, 1.0 - point.x),
        }
    }

    /// Displayed extent of a `width` x `height` buffer.
    pub fn display_extent(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Orientation::Up => (width, height),
            Orientation::Right => (height, width),
        }
    }
}

/// Scales a normalized point to integer pixel coordinates of a `width` x
/// `height` raster. The result is not clamped; `(width, _)` and beyond are out
/// of bounds for the caller to detect. Non-finite points map nowhere.
pub fn to_pixel(point: GridPoint, width: usize, height: usize) -> Option<(i64, i64)> {
    let x = (point.x * width as f32).floor();
    let y = (point.y * height as f32).floor();
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x as i64, y as i64))
}

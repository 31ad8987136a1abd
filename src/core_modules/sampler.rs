// THEORY:
// The sampler turns a grid of display-space points into depth readings. Each
// point goes through the orientation transform, is scaled to the buffer's own
// pixel extent, and is read through the bounds-checked view.
//
// A point that lands outside the buffer is an expected, per-point outcome, not
// a failure of the call: it yields `DEPTH_SENTINEL` and sampling moves on. The
// output always has one entry per input point, in input order.

use crate::core_modules::depth_buffer::DepthBuffer;
use crate::core_modules::grid::GridPoint;
use crate::core_modules::orientation::{Orientation, to_pixel};
use tracing::trace;

/// Reported in place of a reading when no valid sample exists at a point.
/// Valid readings are always >= 0.
pub const DEPTH_SENTINEL: f32 = -1.0;

/// A grid point paired with the depth read for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResult {
    pub point: GridPoint,
    /// Meters, or `DEPTH_SENTINEL`.
    pub depth: f32,
}

impl SampleResult {
    pub fn is_valid(&self) -> bool {
        self.depth >= 0.0
    }
}

/// Reads one depth value per point.
pub fn sample_depth(
    buffer: &DepthBuffer<'_>,
    points: &[GridPoint],
    orientation: Orientation,
) -> Vec<SampleResult> {
    points
        .iter()
        .map(|&point| SampleResult {
            point,
            depth: sample_point(buffer, point, orientation),
        })
        .collect()
}

/// Flattens samples into the value sequence `render_overlay` consumes.
pub fn depth_values(samples: &[SampleResult]) -> Vec<f32> {
    samples.iter().map(|s| s.depth).collect()
}

fn sample_point(buffer: &DepthBuffer<'_>, point: GridPoint, orientation: Orientation) -> f32 {
    let Some((x, y)) = to_pixel(
        orientation.display_to_buffer(point),
        buffer.width(),
        buffer.height(),
    ) else {
        trace!(?point, "grid point is not finite");
        return DEPTH_SENTINEL;
    };
    if x < 0 || y < 0 {
        trace!(x, y, "grid point maps outside depth buffer");
        return DEPTH_SENTINEL;
    }
    match buffer.get(x as usize, y as usize) {
        // Sensors emit NaN or negative values for pixels without a fix.
        Some(depth) if depth.is_finite() && depth >= 0.0 => depth,
        Some(depth) => {
            trace!(x, y, depth, "invalid depth reading");
            DEPTH_SENTINEL
        }
        None => {
            trace!(x, y, "grid point maps outside depth buffer");
            DEPTH_SENTINEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::grid::{Margin, generate_grid};

    fn gradient(width: usize, height: usize) -> Vec<f32> {
        (0..height)
            .flat_map(|_| (0..width).map(move |x| x as f32 / width as f32))
            .collect()
    }

    #[test]
    fn output_matches_input_length_and_order() {
        let samples = gradient(100, 100);
        let buffer = DepthBuffer::from_samples(&samples, 100, 100).unwrap();
        let points = generate_grid(5, 5, Margin::Segments).unwrap();
        let results = sample_depth(&buffer, &points, Orientation::Up);
        assert_eq!(results.len(), points.len());
        for (result, point) in results.iter().zip(&points) {
            assert_eq!(result.point, *point);
        }
    }

    #[test]
    fn reads_values_at_scaled_pixels() {
        let samples = gradient(100, 100);
        let buffer = DepthBuffer::from_samples(&samples, 100, 100).unwrap();
        let points = generate_grid(3, 3, Margin::Segments).unwrap();
        let values = depth_values(&sample_depth(&buffer, &points, Orientation::Up));
        assert_eq!(&values[..3], &[0.25, 0.5, 0.75]);
    }

    #[test]
    fn out_of_bounds_points_yield_sentinel_only_for_themselves() {
        let samples = gradient(10, 10);
        let buffer = DepthBuffer::from_samples(&samples, 10, 10).unwrap();
        let points = [
            GridPoint::new(0.5, 0.5),
            GridPoint::new(1.0, 0.5),
            GridPoint::new(-0.2, 0.5),
            GridPoint::new(0.3, 0.5),
        ];
        let results = sample_depth(&buffer, &points, Orientation::Up);
        assert_eq!(results[0].depth, 0.5);
        assert_eq!(results[1].depth, DEPTH_SENTINEL);
        assert_eq!(results[2].depth, DEPTH_SENTINEL);
        assert_eq!(results[3].depth, 0.3);
        assert!(!results[1].is_valid());
        assert!(results[3].is_valid());
    }

    #[test]
    fn non_finite_points_yield_sentinel() {
        let samples = vec![3.0; 16];
        let buffer = DepthBuffer::from_samples(&samples, 4, 4).unwrap();
        let points = [
            GridPoint::new(f32::NAN, 0.5),
            GridPoint::new(0.5, f32::INFINITY),
            GridPoint::new(0.5, 0.5),
        ];
        for orientation in [Orientation::Up, Orientation::Right] {
            let results = sample_depth(&buffer, &points, orientation);
            assert_eq!(depth_values(&results), vec![DEPTH_SENTINEL, DEPTH_SENTINEL, 3.0]);
        }
    }

    #[test]
    fn invalid_readings_become_sentinel() {
        let samples = [f32::NAN, -0.5, f32::INFINITY, 2.0];
        let buffer = DepthBuffer::from_samples(&samples, 4, 1).unwrap();
        let points: Vec<GridPoint> = (0..4).map(|i| GridPoint::new(i as f32 / 4.0, 0.0)).collect();
        let values = depth_values(&sample_depth(&buffer, &points, Orientation::Up));
        assert_eq!(values, vec![DEPTH_SENTINEL, DEPTH_SENTINEL, DEPTH_SENTINEL, 2.0]);
    }

    #[test]
    fn right_orientation_reads_rotated_location() {
        // 4 wide, 2 tall: value encodes (x, y) as x + 10 * y.
        let samples: Vec<f32> = (0..2)
            .flat_map(|y| (0..4).map(move |x| (x + 10 * y) as f32))
            .collect();
        let buffer = DepthBuffer::from_samples(&samples, 4, 2).unwrap();
        // Display top-right corner is the buffer's top-left pixel.
        let results = sample_depth(&buffer, &[GridPoint::new(0.99, 0.0)], Orientation::Right);
        assert_eq!(results[0].depth, 0.0);
        // Display bottom-right is the buffer's top-right pixel.
        let results = sample_depth(&buffer, &[GridPoint::new(0.99, 0.99)], Orientation::Right);
        assert_eq!(results[0].depth, 3.0);
    }
}

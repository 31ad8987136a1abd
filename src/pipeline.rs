// THEORY:
// The `pipeline` module is the top-level API of the overlay engine. It takes the
// two inputs a capture callback delivers for one frame, a color image and
// (maybe) a depth map, and returns a `Report` with everything the display needs.
//
// Stages, per frame:
// 1.  **Presentation**: The color frame is rotated into display orientation and
//     optionally cropped to its centered square. This is the live feed.
// 2.  **Sampling**: With the depth map's lock held, the fixed grid is mapped into
//     buffer space and read. The lock is released before rendering starts.
// 3.  **Rendering**: Markers and labels are drawn on the chosen base image.
//
// The grid is computed once, when the pipeline is built, and reused for every
// frame. Nothing else carries over between frames.
//
// Color and depth frames are assumed to cover the same field of view, so a
// normalized full-frame point means the same place in both. They may still
// differ in aspect ratio. With `crop_to_square` the visible square is taken
// from the image the overlay is drawn on, and grid points are mapped out of
// that square before sampling.

use crate::core_modules::depth_buffer::{DepthBuffer, LockableDepthMap, with_locked_depth};
use crate::core_modules::grid::GridPoint;
use crate::core_modules::overlay::render_overlay;
use crate::core_modules::sampler::{depth_values, sample_depth};
use crate::core_modules::utils::image_helper::image_helper::{crop_to_center, orient, uncrop_point};
use crate::errors::OverlayResult;
use image::RgbaImage;
use tracing::debug;

// Re-export key data structures for the public API.
pub use crate::config::{OverlayBase, PipelineConfig};
pub use crate::core_modules::overlay::AnnotatedImage;
pub use crate::core_modules::sampler::{DEPTH_SENTINEL, SampleResult};

/// Everything produced for a frame that carried depth.
#[derive(Debug, Clone)]
pub struct OverlayData {
    pub live_feed: RgbaImage,
    pub overlay: AnnotatedImage,
    pub samples: Vec<SampleResult>,
}

/// The output of the pipeline for a single frame.
#[derive(Debug, Clone)]
pub enum Report {
    /// The sensor produced no depth for this frame. The display should keep
    /// its previous overlay.
    NoDepthData { live_feed: RgbaImage },
    Annotated(OverlayData),
}

impl Report {
    pub fn live_feed(&self) -> &RgbaImage {
        match self {
            Report::NoDepthData { live_feed } => live_feed,
            Report::Annotated(data) => &data.live_feed,
        }
    }

    pub fn overlay(&self) -> Option<&AnnotatedImage> {
        match self {
            Report::NoDepthData { .. } => None,
            Report::Annotated(data) => Some(&data.overlay),
        }
    }
}

/// The main, top-level struct for the overlay engine.
#[derive(Debug, Clone)]
pub struct DepthOverlayPipeline {
    config: PipelineConfig,
    grid: Vec<GridPoint>,
}

impl DepthOverlayPipeline {
    pub fn new(config: PipelineConfig) -> OverlayResult<Self> {
        config.validate()?;
        let grid = config.grid.points()?;
        debug!(
            rows = config.grid.rows,
            cols = config.grid.cols,
            orientation = ?config.orientation,
            "depth overlay pipeline configured"
        );
        Ok(Self { config, grid })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The grid, in display space, shared by every frame.
    pub fn grid(&self) -> &[GridPoint] {
        &self.grid
    }

    pub fn process_frame<M: LockableDepthMap + ?Sized>(
        &self,
        color: &RgbaImage,
        depth: Option<&M>,
    ) -> OverlayResult<Report> {
        let live_feed = self.present(color);

        let Some(depth_map) = depth else {
            debug!("frame has no depth data");
            return Ok(Report::NoDepthData { live_feed });
        };

        let (samples, preview) = with_locked_depth(depth_map, |buffer| {
            let base_extent = match self.config.base {
                OverlayBase::Color => color.dimensions(),
                OverlayBase::DepthPreview => (buffer.width() as u32, buffer.height() as u32),
            };
            let samples = self.sample(buffer, base_extent);
            let preview = match self.config.base {
                OverlayBase::DepthPreview => Some(buffer.to_preview(self.config.preview_max_depth)),
                OverlayBase::Color => None,
            };
            (samples, preview)
        })?;

        let values = depth_values(&samples);
        let overlay = match preview {
            Some(preview) => render_overlay(&self.present(&preview), &self.grid, &values, &self.config.style)?,
            None => render_overlay(&live_feed, &self.grid, &values, &self.config.style)?,
        };

        debug!(
            samples = samples.len(),
            valid = samples.iter().filter(|s| s.is_valid()).count(),
            "frame annotated"
        );
        Ok(Report::Annotated(OverlayData {
            live_feed,
            overlay,
            samples,
        }))
    }

    /// Rotates and crops a sensor-oriented image for display.
    fn present(&self, image: &RgbaImage) -> RgbaImage {
        let oriented = orient(image, self.config.orientation);
        if self.config.crop_to_square {
            crop_to_center(&oriented)
        } else {
            oriented
        }
    }

    /// Samples the grid. `base_extent` is the sensor-oriented size of the
    /// image the overlay is drawn on, which decides the visible square.
    fn sample(&self, buffer: &DepthBuffer<'_>, base_extent: (u32, u32)) -> Vec<SampleResult> {
        let orientation = self.config.orientation;
        if !self.config.crop_to_square {
            return sample_depth(buffer, &self.grid, orientation);
        }

        let (width, height) = orientation.display_extent(base_extent.0, base_extent.1);
        let full_frame: Vec<GridPoint> = self
            .grid
            .iter()
            .map(|&point| uncrop_point(point, width, height))
            .collect();
        // Report results against the grid the display sees.
        sample_depth(buffer, &full_frame, orientation)
            .into_iter()
            .zip(&self.grid)
            .map(|(sample, &point)| SampleResult { point, ..sample })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::depth_buffer::OwnedDepthMap;
    use crate::core_modules::grid::{GridSpec, Margin};
    use crate::core_modules::orientation::Orientation;
    use crate::errors::OverlayError;
    use image::Rgba;

    fn color_frame(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]))
    }

    fn config(rows: u32) -> PipelineConfig {
        PipelineConfig {
            grid: GridSpec::square(rows, Margin::Segments),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_grid() {
        let err = DepthOverlayPipeline::new(config(0)).unwrap_err();
        assert!(matches!(err, OverlayError::InvalidConfiguration(_)));
    }

    #[test]
    fn missing_depth_reports_live_feed_only() {
        let pipeline = DepthOverlayPipeline::new(config(3)).unwrap();
        let report = pipeline
            .process_frame::<OwnedDepthMap>(&color_frame(40, 30), None)
            .unwrap();
        assert!(matches!(report, Report::NoDepthData { .. }));
        assert!(report.overlay().is_none());
        assert_eq!(report.live_feed().dimensions(), (40, 30));
    }

    #[test]
    fn annotates_frames_with_one_sample_per_grid_point() {
        let pipeline = DepthOverlayPipeline::new(config(5)).unwrap();
        let depth = OwnedDepthMap::from_fn(256, 192, |_, _| 1.0);
        let report = pipeline
            .process_frame(&color_frame(640, 480), Some(&depth))
            .unwrap();
        let Report::Annotated(data) = report else {
            panic!("expected an annotated frame");
        };
        assert_eq!(data.samples.len(), 25);
        assert!(data.samples.iter().all(|s| s.depth == 1.0));
        assert_eq!(data.overlay.dimensions(), (640, 480));
        assert_eq!(depth.active_locks(), 0);
        assert_eq!(depth.total_locks(), 1);
    }

    #[test]
    fn right_orientation_rotates_outputs() {
        let pipeline = DepthOverlayPipeline::new(PipelineConfig {
            orientation: Orientation::Right,
            ..config(3)
        })
        .unwrap();
        let depth = OwnedDepthMap::from_fn(8, 6, |_, _| 2.0);
        let report = pipeline
            .process_frame(&color_frame(80, 60), Some(&depth))
            .unwrap();
        assert_eq!(report.live_feed().dimensions(), (60, 80));
        assert_eq!(report.overlay().map(|o| o.dimensions()), Some((60, 80)));
    }

    #[test]
    fn depth_preview_base_uses_depth_resolution() {
        let pipeline = DepthOverlayPipeline::new(PipelineConfig {
            base: OverlayBase::DepthPreview,
            ..config(3)
        })
        .unwrap();
        let depth = OwnedDepthMap::from_fn(32, 24, |x, _| x as f32 / 8.0);
        let report = pipeline
            .process_frame(&color_frame(640, 480), Some(&depth))
            .unwrap();
        assert_eq!(report.overlay().map(|o| o.dimensions()), Some((32, 24)));
        assert_eq!(report.live_feed().dimensions(), (640, 480));
    }

    #[test]
    fn cropped_sampling_follows_the_visible_square() {
        let pipeline = DepthOverlayPipeline::new(PipelineConfig {
            crop_to_square: true,
            grid: GridSpec {
                rows: 1,
                cols: 2,
                margin: Margin::Fraction { value: 0.0 },
            },
            ..PipelineConfig::default()
        })
        .unwrap();
        // 400x300 map: the visible square spans x in [50, 350).
        let depth = OwnedDepthMap::from_fn(400, 300, |x, _| x as f32);
        let report = pipeline
            .process_frame(&color_frame(400, 300), Some(&depth))
            .unwrap();
        let Report::Annotated(data) = report else {
            panic!("expected an annotated frame");
        };
        assert_eq!(data.samples[0].depth, 50.0);
        assert_eq!(data.samples[0].point, GridPoint::new(0.0, 0.5));
        // The right edge of the crop is one past the last visible column.
        assert_eq!(data.samples[1].depth, 350.0);
        assert_eq!(data.overlay.dimensions(), (300, 300));
    }

    #[test]
    fn crop_follows_the_base_image_when_aspects_differ() {
        let grid = GridSpec {
            rows: 1,
            cols: 2,
            margin: Margin::Fraction { value: 0.0 },
        };
        // Square depth map under a 2:1 color frame.
        let depth = OwnedDepthMap::from_fn(100, 100, |x, _| x as f32);

        let on_color = DepthOverlayPipeline::new(PipelineConfig {
            crop_to_square: true,
            grid,
            ..PipelineConfig::default()
        })
        .unwrap();
        let Report::Annotated(data) = on_color
            .process_frame(&color_frame(200, 100), Some(&depth))
            .unwrap()
        else {
            panic!("expected an annotated frame");
        };
        // The left edge of the color square is a quarter of the way across.
        assert_eq!(data.samples[0].depth, 25.0);
        assert_eq!(data.overlay.dimensions(), (100, 100));

        let on_preview = DepthOverlayPipeline::new(PipelineConfig {
            crop_to_square: true,
            base: OverlayBase::DepthPreview,
            grid,
            ..PipelineConfig::default()
        })
        .unwrap();
        let Report::Annotated(data) = on_preview
            .process_frame(&color_frame(200, 100), Some(&depth))
            .unwrap()
        else {
            panic!("expected an annotated frame");
        };
        // The depth map is already square, so nothing is cropped away.
        assert_eq!(data.samples[0].depth, 0.0);
    }

    #[test]
    fn bad_depth_layout_fails_the_frame_and_releases_the_lock() {
        let pipeline = DepthOverlayPipeline::new(config(3)).unwrap();
        let depth = OwnedDepthMap::new(Vec::new(), 0, 0).unwrap();
        let err = pipeline
            .process_frame(&color_frame(10, 10), Some(&depth))
            .unwrap_err();
        assert!(matches!(err, OverlayError::InvalidDepthLayout(_)));
        assert_eq!(depth.active_locks(), 0);
    }
}

// THEORY:
// The overlay renderer is the last step of a frame: it takes the base image, the
// grid, and the parallel sequence of depth values, and produces the annotated
// image that goes to the display.
//
// Key architectural principles:
// 1.  **Functional Transform**: The base image is copied, never drawn on. Each
//     call returns a fresh `AnnotatedImage` and keeps nothing.
// 2.  **Independent Scaling**: Grid points are scaled to the *image* extent
//     here, separately from the depth buffer extent used by the sampler. The
//     two rasters may differ in resolution.
// 3.  **Explicit Color Policy**: A value at or under the near threshold is
//     near; anything else, including the out-of-bounds sentinel, is far.
// 4.  **Backend Agnostic**: Drawing goes through `DrawingSurface`, so the same
//     logic drives the bundled CPU rasterizer or a host canvas.

use crate::core_modules::grid::GridPoint;
use crate::core_modules::style::{Color, LabelPolicy, OverlayStyle};
use crate::core_modules::surface::{DrawingSurface, ImageSurface};
use crate::errors::{OverlayError, OverlayResult};
use image::RgbaImage;

/// One frame's finished overlay. Produced per frame, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    image: RgbaImage,
}

impl AnnotatedImage {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Marker color for `depth` under `style`.
pub fn marker_color(depth: f32, style: &OverlayStyle) -> Color {
    if style.is_near(depth) {
        style.near_color
    } else {
        style.far_color
    }
}

/// Formats a depth as a fixed two-decimal label, e.g. `"1.25 m"`.
pub fn format_depth_label(depth: f32, show_unit: bool) -> String {
    if show_unit {
        format!("{depth:.2} m")
    } else {
        format!("{depth:.2}")
    }
}

/// Draws a marker and label for every `(point, value)` pair onto a copy of
/// `image`.
pub fn render_overlay(
    image: &RgbaImage,
    points: &[GridPoint],
    values: &[f32],
    style: &OverlayStyle,
) -> OverlayResult<AnnotatedImage> {
    // Validate before copying the image so a bad call costs nothing.
    check_lengths(points, values)?;
    style.validate()?;

    let mut surface = ImageSurface::new(image)?;
    draw_overlay(&mut surface, points, values, style)?;
    Ok(AnnotatedImage {
        image: surface.into_image(),
    })
}

/// Draws the overlay onto any surface.
pub fn draw_overlay<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    points: &[GridPoint],
    values: &[f32],
    style: &OverlayStyle,
) -> OverlayResult<()> {
    check_lengths(points, values)?;
    style.validate()?;

    let (width, height) = surface.dimensions();
    for (point, &depth) in points.iter().zip(values) {
        let center = (point.x * width as f32, point.y * height as f32);
        let near = style.is_near(depth);

        let fill = if style.color_by_distance {
            marker_color(depth, style)
        } else {
            style.marker_fill_color
        };
        surface.fill_circle(center, style.marker_radius, fill);
        if let Some(stroke) = style.marker_stroke_color {
            surface.stroke_circle(center, style.marker_radius, stroke);
        }

        if style.label_policy == LabelPolicy::NearOnly && !near {
            continue;
        }
        let origin = (center.0 + style.text_offset.0, center.1 + style.text_offset.1);
        surface.draw_text(
            origin,
            &format_depth_label(depth, style.show_unit),
            style.font_size,
            style.text_color,
        );
    }
    Ok(())
}

fn check_lengths(points: &[GridPoint], values: &[f32]) -> OverlayResult<()> {
    if points.len() != values.len() {
        return Err(OverlayError::InvalidArgument(format!(
            "{} grid points but {} depth values",
            points.len(),
            values.len()
        )));
    }
    Ok(())
}

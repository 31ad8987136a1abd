// THEORY:
// The overlay renderer never talks to a graphics backend directly. It draws
// through `DrawingSurface`, which exposes the three primitives an annotation
// needs: fill a circle, stroke a circle, and draw a line of text. A host can back
// it with a GPU canvas or a platform graphics context; the crate ships
// `ImageSurface`, which rasterizes into an `image::RgbaImage` with `imageproc`.
//
// All coordinates are in the surface's own pixel space, with (0, 0) at the
// top-left corner. Primitives that fall partly or wholly outside the surface are
// clipped, never an error. Colors are alpha-blended over what is already there.

use crate::core_modules::style::Color;
use crate::errors::{OverlayError, OverlayResult};
use ab_glyph::{FontArc, PxScale};
use image::RgbaImage;
use imageproc::drawing::{Blend, draw_filled_circle_mut, draw_hollow_circle_mut, draw_text_mut};

/// DejaVu Sans Mono, bundled so labels render without any system fonts.
static LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

pub trait DrawingSurface {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color);
    fn stroke_circle(&mut self, center: (f32, f32), radius: f32, color: Color);
    /// Draws `text` with its top-left corner at `origin`. `font_size` is the
    /// pixel height of the font's em square.
    fn draw_text(&mut self, origin: (f32, f32), text: &str, font_size: f32, color: Color);
}

/// Parses the bundled label font.
pub fn default_font() -> OverlayResult<FontArc> {
    FontArc::try_from_slice(LABEL_FONT).map_err(|err| OverlayError::Font(err.to_string()))
}

/// A `DrawingSurface` that rasterizes into an owned copy of a base image.
pub struct ImageSurface {
    canvas: Blend<RgbaImage>,
    font: FontArc,
}

impl ImageSurface {
    /// Starts from a copy of `base` with the bundled font; the original is
    /// left untouched.
    pub fn new(base: &RgbaImage) -> OverlayResult<Self> {
        Ok(Self::with_font(base, default_font()?))
    }

    pub fn with_font(base: &RgbaImage, font: FontArc) -> Self {
        Self {
            canvas: Blend(base.clone()),
            font,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas.0
    }
}

fn pixel_center(center: (f32, f32)) -> (i32, i32) {
    (center.0.floor() as i32, center.1.floor() as i32)
}

impl DrawingSurface for ImageSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.canvas.0.dimensions()
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        // Sub-pixel radii round to zero, which still marks the center pixel.
        draw_filled_circle_mut(
            &mut self.canvas,
            pixel_center(center),
            radius.round() as i32,
            color.to_rgba(),
        );
    }

    fn stroke_circle(&mut self, center: (f32, f32), radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        draw_hollow_circle_mut(
            &mut self.canvas,
            pixel_center(center),
            radius.round() as i32,
            color.to_rgba(),
        );
    }

    fn draw_text(&mut self, origin: (f32, f32), text: &str, font_size: f32, color: Color) {
        draw_text_mut(
            &mut self.canvas,
            color.to_rgba(),
            origin.0.round() as i32,
            origin.1.round() as i32,
            PxScale::from(font_size),
            &self.font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    fn surface(width: u32, height: u32) -> ImageSurface {
        ImageSurface::new(&blank(width, height)).unwrap()
    }

    fn inked(image: &RgbaImage) -> Vec<(u32, u32)> {
        image
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel.0 != [0, 0, 0, 255])
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn bundled_font_parses() {
        assert!(default_font().is_ok());
    }

    #[test]
    fn fill_circle_covers_center_and_leaves_corners() {
        let mut surface = surface(20, 20);
        surface.fill_circle((10.0, 10.0), 4.0, Color::RED);
        let image = surface.into_image();
        assert_eq!(image.get_pixel(10, 10).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(9, 9).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(15, 15).0, [0, 0, 0, 255]);
    }

    #[test]
    fn tiny_markers_still_mark_their_pixel() {
        let mut surface = surface(4, 4);
        surface.fill_circle((2.0, 2.0), 0.25, Color::GREEN);
        assert_eq!(surface.into_image().get_pixel(2, 2).0, [0, 255, 0, 255]);
    }

    #[test]
    fn stroke_circle_leaves_interior() {
        let mut surface = surface(30, 30);
        surface.stroke_circle((15.0, 15.0), 6.0, Color::WHITE);
        let image = surface.into_image();
        assert_eq!(image.get_pixel(15, 15).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(21, 15).0, [255, 255, 255, 255]);
    }

    #[test]
    fn translucent_fill_blends_with_base() {
        let mut surface = surface(10, 10);
        surface.fill_circle((5.0, 5.0), 2.0, Color::rgba(255, 255, 255, 0));
        assert_eq!(surface.into_image().get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn shapes_are_clipped_at_the_border() {
        let mut surface = surface(5, 5);
        surface.fill_circle((0.0, 0.0), 3.0, Color::RED);
        surface.draw_text((-4.0, 3.0), "8.88 m", 7.0, Color::GREEN);
        let image = surface.into_image();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn text_is_drawn_below_and_right_of_its_origin() {
        let mut surface = surface(60, 30);
        surface.draw_text((10.0, 8.0), "1.25 m", 12.0, Color::GREEN);
        let ink = inked(&surface.into_image());
        assert!(!ink.is_empty());
        assert!(ink.iter().all(|&(x, y)| x >= 10 && y >= 8 && y < 8 + 12));
    }

    #[test]
    fn font_size_changes_label_extent() {
        let draw = |size: f32| {
            let mut surface = surface(80, 40);
            surface.draw_text((2.0, 2.0), "1.25 m", size, Color::GREEN);
            surface.into_image()
        };
        let small = draw(7.5);
        let large = draw(10.0);
        assert_ne!(small, large);

        let right_edge = |image: &RgbaImage| inked(image).iter().map(|&(x, _)| x).max();
        assert!(right_edge(&small) < right_edge(&large));
    }

    #[test]
    fn base_image_is_not_modified() {
        let base = blank(8, 8);
        let mut surface = ImageSurface::new(&base).unwrap();
        surface.fill_circle((4.0, 4.0), 3.0, Color::RED);
        assert_eq!(base.get_pixel(4, 4).0, [0, 0, 0, 255]);
    }
}

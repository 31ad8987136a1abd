pub mod image_helper {
    use crate::core_modules::grid::GridPoint;
    use crate::core_modules::orientation::Orientation;
    use image::{ImageEncoder, RgbaImage, imageops};
    use std::path::Path;

    pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> Result<(), image::error::ImageError> {
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }

    /// Rotates a sensor-oriented frame into display orientation.
    pub fn orient(image: &RgbaImage, orientation: Orientation) -> RgbaImage {
        match orientation {
            Orientation::Up => image.clone(),
            Orientation::Right => imageops::rotate90(image),
        }
    }

    /// The centered square of a `width` x `height` frame as `(x, y, side)`.
    pub fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
        if width > height {
            ((width - height) / 2, 0, height)
        } else {
            (0, (height - width) / 2, width)
        }
    }

    /// Crops a frame to its centered square, e.g. 4:3 to 1:1.
    pub fn crop_to_center(image: &RgbaImage) -> RgbaImage {
        let (x, y, side) = center_square(image.width(), image.height());
        imageops::crop_imm(image, x, y, side, side).to_image()
    }

    /// Maps a point normalized to the centered square back to the full
    /// `width` x `height` frame it was cropped from.
    pub fn uncrop_point(point: GridPoint, width: u32, height: u32) -> GridPoint {
        if width == 0 || height == 0 {
            return point;
        }
        let (x, y, side) = center_square(width, height);
        GridPoint::new(
            (x as f32 + point.x * side as f32) / width as f32,
            (y as f32 + point.y * side as f32) / height as f32,
        )
    }
}

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{RgbImage, RgbaImage};
use log::debug;

/// Decodes stored photo payloads for display and export.
///
/// Stored payloads are never modified; everything here produces new buffers.
pub struct ImageProcessor {
    max_texture_edge: u32,
}

impl ImageProcessor {
    pub fn new(max_texture_edge: u32) -> Self {
        Self {
            max_texture_edge: max_texture_edge.max(1),
        }
    }

    /// Decodes `bytes` for an on-screen texture, shrinking anything larger
    /// than the GPU-friendly edge length.
    pub fn decode_for_display(&self, bytes: &[u8]) -> Result<RgbaImage> {
        let image = image::load_from_memory(bytes)
            .context("Failed to decode photo for display")?
            .to_rgba8();

        let (width, height) = image.dimensions();
        if width <= self.max_texture_edge && height <= self.max_texture_edge {
            return Ok(image);
        }

        let (new_width, new_height) =
            fit_dimensions(width, height, self.max_texture_edge, self.max_texture_edge);
        debug!(
            "Shrinking display texture from {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        Ok(image::imageops::resize(&image, new_width, new_height, FilterType::Triangle))
    }
}

/// Decodes `bytes` into an RGB buffer.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).context("Failed to decode photo")?;
    Ok(image.to_rgb8())
}

/// Scales `image` up or down to the largest size that fits `max_width` x
/// `max_height` with the aspect ratio kept.
pub fn scale_to_fit(image: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = fit_dimensions(image.width(), image.height(), max_width, max_height);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Largest size with the aspect ratio of `width` x `height` that fits inside
/// the bounds. Never returns a zero edge.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }

    let width_ratio = max_width as f32 / width as f32;
    let height_ratio = max_height as f32 / height as f32;
    let scale = width_ratio.min(height_ratio);

    let new_width = ((width as f32 * scale).round() as u32).clamp(1, max_width.max(1));
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, max_height.max(1));
    (new_width, new_height)
}

#[cfg(test)]
pub fn create_gradient_image(width: u32, height: u32) -> RgbImage {
    image::ImageBuffer::from_fn(width, height, |x, y| {
        let r = (255.0 * x as f32 / width as f32) as u8;
        let g = (255.0 * y as f32 / height as f32) as u8;
        let b = (255.0 * (x + y) as f32 / (width + height) as f32) as u8;
        image::Rgb([r, g, b])
    })
}

/// PNG-encoded gradient, for tests that need a decodable payload.
#[cfg(test)]
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(create_gradient_image(width, height))
        .write_to(&mut cursor, image::ImageOutputFormat::Png)
        .unwrap();
    cursor.into_inner()
}

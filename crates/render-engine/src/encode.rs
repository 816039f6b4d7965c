//! Compressed frame encoding.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use squatcount_common::error::{SquatError, SquatResult};

/// Encode an RGB frame as JPEG. `quality` is clamped to `1..=100`.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> SquatResult<Vec<u8>> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(SquatError::render("Cannot encode an empty frame"));
    }

    // One byte per pixel comfortably covers typical JPEG output.
    let mut buffer = Vec::with_capacity(width as usize * height as usize);
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder.encode_image(frame)?;
    tracing::trace!(width, height, quality, bytes = buffer.len(), "Frame encoded");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn output_is_a_jpeg_stream() {
        let frame = RgbImage::from_pixel(32, 24, Rgb([200, 40, 40]));
        let jpeg = encode_jpeg(&frame, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = RgbImage::new(0, 0);
        assert!(matches!(encode_jpeg(&frame, 80), Err(SquatError::Render { .. })));
    }
}

//! Raster decoding through the `image` crate

use image::DynamicImage;

use super::ImageBuffer;
use crate::error::{Result, ViewerError};

/// Decode PNG/JPEG/BMP/... bytes, sniffing the container from content
///
/// Alpha is dropped: gray and gray+alpha become one component, rgb and
/// rgba become three.
pub fn decode_raster(bytes: &[u8]) -> Result<ImageBuffer> {
    let img = image::load_from_memory(bytes).map_err(|e| ViewerError::Decode(e.to_string()))?;
    let (width, height) = (img.width(), img.height());

    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_) => {
            let samples = img.to_luma8().into_raw().into_iter().map(f32::from).collect();
            ImageBuffer::new(width, height, 1, samples)
        }
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            let samples = img.to_luma16().into_raw().into_iter().map(f32::from).collect();
            ImageBuffer::new(width, height, 1, samples)
        }
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            let samples = img.to_rgb8().into_raw().into_iter().map(f32::from).collect();
            ImageBuffer::new(width, height, 3, samples)
        }
        other => {
            // 16-bit and float color: normalize down to 8-bit display range
            log::debug!("Converting {:?} raster to 8-bit rgb", other.color());
            let samples = other.to_rgb8().into_raw().into_iter().map(f32::from).collect();
            ImageBuffer::new(width, height, 3, samples)
        }
    }
}

//! Pixel decoding
//!
//! Turns opaque bytes plus a format tag into an [`ImageBuffer`]:
//! - raster formats through the `image` crate (raster.rs)
//! - single-frame DICOM through the `dicom` crate (dicom.rs)

pub mod dicom;
pub mod raster;

use std::path::Path;

use crate::domain::{PixelPos, SampleValue};
use crate::error::{Result, ViewerError};

/// Source format, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Single frame of a volumetric study (DICOM)
    Volumetric,
    /// Common raster image (PNG, JPEG, ...)
    Raster,
}

impl ImageFormat {
    /// Infer the format from a file name or logical identifier
    ///
    /// Unknown extensions fall back to raster, where the decoder sniffs content.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("dcm" | "dicom") => ImageFormat::Volumetric,
            _ => ImageFormat::Raster,
        }
    }
}

/// Number of color channels per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Components {
    Gray,
    Rgb,
}

impl Components {
    pub fn from_count(count: u16) -> Result<Self> {
        match count {
            1 => Ok(Components::Gray),
            3 => Ok(Components::Rgb),
            other => Err(ViewerError::UnsupportedFormat { components: other }),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Components::Gray => 1,
            Components::Rgb => 3,
        }
    }
}

/// Min/max of the raw grayscale samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn span(&self) -> f64 {
        self.max as f64 - self.min as f64
    }
}

/// Decoded image, immutable after construction
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    components: Components,
    /// Row-major, interleaved when color
    samples: Vec<f32>,
    /// Present for grayscale only
    value_range: Option<ValueRange>,
}

impl ImageBuffer {
    /// Build a buffer, validating the sample count and scanning the range once
    pub fn new(width: u32, height: u32, components: u16, samples: Vec<f32>) -> Result<Self> {
        let components = Components::from_count(components)?;
        if width == 0 || height == 0 {
            return Err(ViewerError::Decode(format!(
                "empty image ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize * components.count();
        if samples.len() != expected {
            return Err(ViewerError::Decode(format!(
                "expected {} samples, got {}",
                expected,
                samples.len()
            )));
        }

        let value_range = match components {
            Components::Gray => Some(scan_range(&samples)?),
            Components::Rgb => None,
        };

        Ok(Self {
            width,
            height,
            components,
            samples,
            value_range,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> Components {
        self.components
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.value_range
    }

    pub fn contains(&self, pixel: PixelPos) -> bool {
        pixel.x < self.width && pixel.y < self.height
    }

    /// Raw sample at a pixel, `None` when out of bounds
    pub fn sample_at(&self, pixel: PixelPos) -> Option<SampleValue> {
        if !self.contains(pixel) {
            return None;
        }
        let n = self.components.count();
        let idx = (pixel.y as usize * self.width as usize + pixel.x as usize) * n;
        match self.components {
            Components::Gray => Some(SampleValue::Gray(self.samples[idx])),
            Components::Rgb => Some(SampleValue::Rgb([
                self.samples[idx],
                self.samples[idx + 1],
                self.samples[idx + 2],
            ])),
        }
    }
}

fn scan_range(samples: &[f32]) -> Result<ValueRange> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &s in samples {
        if !s.is_finite() {
            return Err(ViewerError::Decode("non-finite sample value".into()));
        }
        min = min.min(s);
        max = max.max(s);
    }
    Ok(ValueRange { min, max })
}

/// Decode bytes according to the format tag
pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<ImageBuffer> {
    let image = match format {
        ImageFormat::Volumetric => dicom::decode_dicom(bytes)?,
        ImageFormat::Raster => raster::decode_raster(bytes)?,
    };
    log::debug!(
        "Decoded {:?} image: {}x{} ({:?})",
        format,
        image.width(),
        image.height(),
        image.components()
    );
    Ok(image)
}

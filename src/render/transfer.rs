//! Window/level transfer function
//!
//! Maps raw samples to an 8-bit RGBA texture. Grayscale samples are
//! windowed; color samples pass through untouched.

use image::RgbaImage;

use crate::decode::{Components, ImageBuffer, ValueRange};

/// Smallest window width accepted, in raw sample units
pub const MIN_WINDOW_WIDTH: f64 = 1.0;

/// Brightness/contrast interval in raw sample units
///
/// `width` is always positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    width: f64,
    center: f64,
}

impl WindowLevel {
    pub fn new(width: f64, center: f64) -> Self {
        Self {
            width: width.max(MIN_WINDOW_WIDTH),
            center,
        }
    }

    /// Full-range window: `{width: max - min, center: (min + max) / 2}`
    pub fn from_range(range: ValueRange) -> Self {
        let (min, max) = (range.min as f64, range.max as f64);
        Self::new(max - min, (min + max) / 2.0)
    }

    /// Initial window for a freshly decoded image
    pub fn initial(image: &ImageBuffer) -> Self {
        match image.value_range() {
            Some(range) => Self::from_range(range),
            // Unused for color, but keeps the invariant
            None => Self::new(255.0, 127.5),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn lower(&self) -> f64 {
        self.center - self.width / 2.0
    }

    pub fn upper(&self) -> f64 {
        self.center + self.width / 2.0
    }

    /// Shift width and center by raw-unit deltas
    pub fn adjusted(&self, d_width: f64, d_center: f64) -> Self {
        Self::new(self.width + d_width, self.center + d_center)
    }

    /// Display value for one grayscale sample
    #[inline]
    pub fn map(&self, sample: f32) -> u8 {
        let s = sample as f64;
        let (lo, hi) = (self.lower(), self.upper());
        if s <= lo {
            0
        } else if s >= hi {
            255
        } else {
            (255.0 * (s - lo) / (hi - lo)).round() as u8
        }
    }
}

/// Produce the display texture for an image under a window/level
pub fn apply(image: &ImageBuffer, window: WindowLevel) -> RgbaImage {
    let (w, h) = (image.width(), image.height());
    let mut out = Vec::with_capacity(w as usize * h as usize * 4);

    match image.components() {
        Components::Gray => {
            for &s in image.samples() {
                let v = window.map(s);
                out.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Components::Rgb => {
            for px in image.samples().chunks_exact(3) {
                out.extend_from_slice(&[
                    px[0].clamp(0.0, 255.0) as u8,
                    px[1].clamp(0.0, 255.0) as u8,
                    px[2].clamp(0.0, 255.0) as u8,
                    255,
                ]);
            }
        }
    }

    // Length is exact by construction
    RgbaImage::from_raw(w, h, out).unwrap_or_else(|| RgbaImage::new(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_image() -> ImageBuffer {
        let mut samples = vec![105.0_f32; 16];
        samples[0] = 10.0;
        samples[15] = 200.0;
        ImageBuffer::new(4, 4, 1, samples).unwrap()
    }

    #[test]
    fn test_initial_window_from_range() {
        let wl = WindowLevel::initial(&scenario_image());
        assert_eq!(wl.width(), 190.0);
        assert_eq!(wl.center(), 105.0);
    }

    #[test]
    fn test_min_and_max_hit_display_extremes() {
        let image = scenario_image();
        let tex = apply(&image, WindowLevel::initial(&image));
        assert_eq!(tex.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(tex.get_pixel(3, 3).0, [255, 255, 255, 255]);
        // Center of the window maps to mid-gray
        assert_eq!(tex.get_pixel(1, 1).0[0], 128);
    }

    #[test]
    fn test_map_rounds_linearly() {
        let wl = WindowLevel::new(100.0, 50.0);
        assert_eq!(wl.map(-5.0), 0);
        assert_eq!(wl.map(0.0), 0);
        assert_eq!(wl.map(10.0), 26); // 25.5 rounds up
        assert_eq!(wl.map(100.0), 255);
        assert_eq!(wl.map(1e6), 255);
    }

    #[test]
    fn test_width_never_collapses() {
        let flat = ValueRange { min: 7.0, max: 7.0 };
        assert_eq!(WindowLevel::from_range(flat).width(), MIN_WINDOW_WIDTH);
        assert_eq!(WindowLevel::new(10.0, 0.0).adjusted(-50.0, 0.0).width(), MIN_WINDOW_WIDTH);
    }

    #[test]
    fn test_color_passes_through() {
        let image = ImageBuffer::new(1, 1, 3, vec![12.0, 34.0, 56.0]).unwrap();
        let tex = apply(&image, WindowLevel::new(1.0, 0.0));
        assert_eq!(tex.get_pixel(0, 0).0, [12, 34, 56, 255]);
    }
}
